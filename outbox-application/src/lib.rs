//! 应用层
//!
//! - `UseCase`：在一个工作单元内执行的业务用例；
//! - `TransactionalUseCase`：为每次调用开启一个工作单元，用例返回错误时整体回滚；
//! - `MarkEventForRepublish`：运维强制重投。
//!
pub mod context;
pub mod error;
pub mod republish;
pub mod use_case;

pub use republish::MarkEventForRepublish;
pub use use_case::{TransactionalUseCase, UseCase};
