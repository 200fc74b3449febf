mod expression_parse;
mod script_compile;
mod source;

pub use expression_parse::{parse_expression, parse_operand, try_parse_expression};
pub use script_compile::compile_script;
pub use source::{BranchSource, NodeBody, NodeSource, OptionSource, ScriptSource, END_LABEL};
