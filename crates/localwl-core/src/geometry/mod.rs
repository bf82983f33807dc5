pub mod cell_list;
pub mod periodic_box;

pub use cell_list::CellList;
pub use periodic_box::PeriodicBox;
