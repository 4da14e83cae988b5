pub mod aggregate;
pub mod bill;
pub mod btm;
pub mod dispatch;
pub mod harness;
pub mod period;
pub mod reconciler;
pub mod runner;
pub mod series;
pub mod slicer;
