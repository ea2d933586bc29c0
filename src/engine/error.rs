#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    CourierNotFound(u64),
    /// Absent order, or an order that belongs to another courier — the two
    /// cases are deliberately indistinguishable to the caller.
    OrderNotFound(u64),
    IdsTaken {
        collection: &'static str,
        ids: Vec<u64>,
    },
    CompleteBeforeAssign(u64),
    LimitExceeded(&'static str),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::CourierNotFound(_) => write!(f, "courier with specified id not found"),
            EngineError::OrderNotFound(_) => write!(f, "order with specified id not found"),
            EngineError::IdsTaken { collection, ids } => {
                write!(f, "{collection} ids already taken: {ids:?}")
            }
            EngineError::CompleteBeforeAssign(id) => {
                write!(f, "complete_time precedes assign_time for order {id}")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
