pub mod wbs_tree;

pub use wbs_tree::WbsTree;
