//! Per-instrument position history with at most one open position each.

use chrono::NaiveDate;

use super::position::Position;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionBook {
    positions: Vec<Position>,
    next_id: usize,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a position, or returns `None` if `instrument` already has one open.
    pub fn open(&mut self, instrument: &str, date: NaiveDate, price: f64) -> Option<usize> {
        if self.has_open(instrument) {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.positions.push(Position::open(id, instrument, date, price));
        Some(id)
    }

    pub fn has_open(&self, instrument: &str) -> bool {
        self.open_count(instrument) > 0
    }

    pub fn open_count(&self, instrument: &str) -> usize {
        self.positions
            .iter()
            .filter(|p| p.is_open() && p.instrument == instrument)
            .count()
    }

    /// Closes every open position of `instrument`, returning how many were closed.
    pub fn close_all_open(&mut self, instrument: &str, date: NaiveDate, price: f64) -> usize {
        let mut closed = 0;
        for pos in self
            .positions
            .iter_mut()
            .filter(|p| p.is_open() && p.instrument == instrument)
        {
            pos.close(date, price);
            closed += 1;
        }
        closed
    }

    pub fn get(&self, id: usize) -> Option<&Position> {
        self.positions.iter().find(|p| p.id == id)
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn closed(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| !p.is_open())
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn into_positions(self) -> Vec<Position> {
        self.positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn new_book_is_empty() {
        let book = PositionBook::new();
        assert!(book.is_empty());
        assert!(!book.has_open("BHP"));
    }

    #[test]
    fn open_rejects_second_open_position() {
        let mut book = PositionBook::new();
        assert_eq!(book.open("BHP", date(2), 100.0), Some(0));
        assert_eq!(book.open("BHP", date(3), 101.0), None);
        assert_eq!(book.open_count("BHP"), 1);
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn instruments_are_independent() {
        let mut book = PositionBook::new();
        assert!(book.open("BHP", date(2), 100.0).is_some());
        assert!(book.open("CBA", date(2), 50.0).is_some());
        assert_eq!(book.open_count("BHP"), 1);
        assert_eq!(book.open_count("CBA"), 1);
    }

    #[test]
    fn close_all_then_reopen() {
        let mut book = PositionBook::new();
        let id = book.open("BHP", date(2), 100.0).unwrap();
        assert_eq!(book.close_all_open("BHP", date(9), 110.0), 1);
        assert!(!book.has_open("BHP"));
        assert_eq!(book.get(id).unwrap().exit_price, Some(110.0));

        let id2 = book.open("BHP", date(10), 111.0).unwrap();
        assert_ne!(id, id2);
        assert_eq!(book.closed().count(), 1);
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn close_all_with_nothing_open() {
        let mut book = PositionBook::new();
        assert_eq!(book.close_all_open("BHP", date(9), 110.0), 0);
    }
}
