use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The lowercase wire form used by broker REST APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a submitted order as reported by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Accepted by the broker but not yet (fully) executed.
    Pending,
    PartiallyFilled,
    Filled,
    Rejected,
    Canceled,
    Expired,
}

impl OrderStatus {
    /// Maps a broker status string onto our lifecycle. Anything we do not
    /// recognise is treated as still pending; the fill wait is deadline-bound.
    pub fn from_broker(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "filled" => OrderStatus::Filled,
            "partially_filled" => OrderStatus::PartiallyFilled,
            "rejected" => OrderStatus::Rejected,
            "canceled" | "cancelled" => OrderStatus::Canceled,
            "expired" | "done_for_day" => OrderStatus::Expired,
            _ => OrderStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Rejected | OrderStatus::Canceled | OrderStatus::Expired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_statuses_map_to_lifecycle() {
        assert_eq!(OrderStatus::from_broker("filled"), OrderStatus::Filled);
        assert_eq!(OrderStatus::from_broker("REJECTED"), OrderStatus::Rejected);
        assert_eq!(OrderStatus::from_broker("done_for_day"), OrderStatus::Expired);
        assert_eq!(OrderStatus::from_broker("pending_new"), OrderStatus::Pending);
        assert_eq!(OrderStatus::from_broker("accepted"), OrderStatus::Pending);
    }

    #[test]
    fn only_final_states_are_terminal() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
    }
}
