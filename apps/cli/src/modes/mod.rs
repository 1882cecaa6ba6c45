//! 运行模式
//!
//! - `repl`: 交互式菜单循环

pub mod repl;
