mod cube;

pub use cube::{CubeParseError, CubeParser};

/// 获取所有可用的解析器
pub fn get_all_parsers() -> Vec<Box<dyn crate::utils::parser::DensityFileParser>> {
    vec![Box::new(CubeParser::new())]
}
