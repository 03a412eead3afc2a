//! App - アプリケーション層
//!
//! # 主要コンポーネント
//! - **Applier**: dequeue→commit→respond のループ
//! - **LeaderTerm**: term ごとの PlanQueue / Applier / StatsReporter の所有者

pub mod applier;
pub mod term;

pub use self::applier::Applier;
pub use self::term::LeaderTerm;
