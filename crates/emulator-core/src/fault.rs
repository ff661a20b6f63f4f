//! Runtime fault taxonomy.

use thiserror::Error;

/// Reasons the CPU refuses to continue.
///
/// Raising any fault sets `ERR`, clears `RUN`, and leaves `PC` at the
/// faulting instruction. The machine is not stepped further until reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Fault {
    /// Opcode field combination with no defined operation.
    #[error("illegal instruction encoding")]
    IllegalEncoding,
    /// `IN`/`OUT` named a port address outside `0x00..0x10`.
    #[error("i/o port address out of range")]
    InvalidPort,
}

#[cfg(test)]
mod tests {
    use super::Fault;

    #[test]
    fn fault_messages_name_the_cause() {
        assert_eq!(
            Fault::IllegalEncoding.to_string(),
            "illegal instruction encoding"
        );
        assert_eq!(
            Fault::InvalidPort.to_string(),
            "i/o port address out of range"
        );
    }
}
