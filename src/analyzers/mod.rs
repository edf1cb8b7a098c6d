pub mod rug_check;
pub mod safety_scorer;
