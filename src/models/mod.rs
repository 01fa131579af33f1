pub mod activity;
pub mod company;
pub mod employee;
pub mod order;
pub mod product;
