/// Errors from building a detector or rendering markers.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ArucoError {
    #[error("unknown dictionary `{0}`")]
    UnknownDictionary(String),

    #[error("max_hamming {requested} exceeds the correction capacity {max} of {dictionary}")]
    HammingTooLarge {
        requested: u8,
        max: u8,
        dictionary: &'static str,
    },

    #[error("marker id {id} is not in {dictionary} ({len} markers)")]
    UnknownMarkerId {
        id: u32,
        dictionary: &'static str,
        len: usize,
    },

    #[error("invalid detector parameters: {0}")]
    InvalidParams(String),
}
