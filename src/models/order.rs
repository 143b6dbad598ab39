use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayType {
    Weekday,
    Weekend,
}

impl DayType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "weekday" => Some(DayType::Weekday),
            "weekend" => Some(DayType::Weekend),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayType::Weekday => "Weekday",
            DayType::Weekend => "Weekend",
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        DayType::parse(s).ok_or_else(|| format!("expected 'weekday' or 'weekend', got '{}'", s))
    }
}

/// A row as read from the dataset, before cleaning.
///
/// Identifiers are guaranteed present; every other field may be absent
/// because it was empty, unparseable, or explicitly marked as not given.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    /// 1-based line number in the source file (header is line 1)
    pub line: u64,
    pub order_id: u64,
    pub customer_id: u64,
    pub restaurant_name: String,
    pub cuisine_type: String,
    pub cost: Option<f64>,
    pub day_type: Option<DayType>,
    pub rating: Option<u32>,
    pub preparation_time: Option<f64>,
    pub delivery_time: Option<f64>,
}

/// A cleaned order. Range constraints are declared here and enforced by the cleaner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Order {
    pub order_id: u64,
    pub customer_id: u64,
    pub restaurant_name: String,
    pub cuisine_type: String,

    #[validate(range(min = 0.0))]
    pub cost: Option<f64>,

    pub day_type: Option<DayType>,

    #[validate(range(min = 1, max = 5))]
    pub rating: Option<u32>,

    #[validate(range(min = 0.0))]
    pub preparation_time: Option<f64>,

    #[validate(range(min = 0.0))]
    pub delivery_time: Option<f64>,

    pub completion_time: Option<f64>,
}

impl Order {
    pub fn rating_present(&self) -> bool {
        self.rating.is_some()
    }

    pub fn has_cost(&self) -> bool {
        self.cost.is_some()
    }

    /// Preparation plus delivery, absent when either side is absent.
    pub fn derive_completion_time(&mut self) {
        self.completion_time = match (self.preparation_time, self.delivery_time) {
            (Some(prep), Some(delivery)) => Some(prep + delivery),
            _ => None,
        };
    }
}

/// The cleaned, immutable input to every metric computation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderTable {
    orders: Vec<Order>,
}

impl OrderTable {
    pub fn new(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Order> {
        self.orders.iter()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn filter<F>(&self, predicate: F) -> OrderTable
    where
        F: Fn(&Order) -> bool,
    {
        OrderTable::new(self.orders.iter().filter(|o| predicate(o)).cloned().collect())
    }
}

impl<'a> IntoIterator for &'a OrderTable {
    type Item = &'a Order;
    type IntoIter = std::slice::Iter<'a, Order>;

    fn into_iter(self) -> Self::IntoIter {
        self.orders.iter()
    }
}
