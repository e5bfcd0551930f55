//! Errors reported to the host.

use thiserror::Error;

/// Host misuse of a core's inspection interface.
///
/// Internal-consistency failures (a micro-step with no handler) are not
/// represented here: they are bugs in the instruction tables and panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("register {register} does not exist on the {variant}")]
    InvalidRegister {
        register: &'static str,
        variant: &'static str,
    },

    #[error("value {value:#X} does not fit register {register}")]
    ValueOutOfRange { register: &'static str, value: u32 },
}
