use crate::vector::OpaqueValue;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleError {
    #[error("resolved location vector {handle} was already released")]
    Released { handle: OpaqueValue },

    #[error("resolved location vector {handle} was never issued on this thread")]
    Unknown { handle: OpaqueValue },

    #[error("null resolved location vector handle")]
    Null,

    #[error("resolved location registry accessed while already in use")]
    Reentrant,
}
