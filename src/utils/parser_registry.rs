use crate::utils::parser::DensityFileParser;

/// 解析器注册表
/// 管理所有可用的密度网格解析器，并根据文件扩展名匹配对应的解析器
pub struct ParserRegistry {
    parsers: Vec<Box<dyn DensityFileParser>>,
}

impl ParserRegistry {
    /// 创建新的解析器注册表，自动注册所有可用的解析器
    pub fn new() -> Self {
        let parsers = crate::parsers::get_all_parsers();
        Self { parsers }
    }

    /// 根据文件扩展名查找匹配的解析器
    /// extension: 文件扩展名（不含点号），例如 "cube"
    pub fn find_parser(&self, extension: &str) -> Option<&dyn DensityFileParser> {
        self.parsers
            .iter()
            .find(|parser| parser.supports(extension))
            .map(|p| p.as_ref())
    }

    /// 根据文件路径查找匹配的解析器
    /// 自动提取文件扩展名
    pub fn find_parser_for_file(
        &self,
        file_path: &str,
    ) -> Option<(&dyn DensityFileParser, String)> {
        let extension = std::path::Path::new(file_path)
            .extension()
            .and_then(|ext| ext.to_str())?
            .to_string();

        self.find_parser(&extension)
            .map(|parser| (parser, extension))
    }

    /// 获取所有支持的扩展名列表
    pub fn supported_extensions(&self) -> Vec<String> {
        let mut extensions = Vec::new();
        for parser in &self.parsers {
            extensions.extend(
                parser
                    .supported_extensions()
                    .iter()
                    .map(|s| s.to_lowercase()),
            );
        }
        extensions.sort();
        extensions.dedup();
        extensions
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_matches_cube_extension() {
        let registry = ParserRegistry::new();
        assert!(registry.find_parser("cube").is_some());
        assert!(registry.find_parser("CUBE").is_some());
        assert!(registry.find_parser("xyz").is_none());
    }

    #[test]
    fn registry_matches_by_file_path() {
        let registry = ParserRegistry::new();
        let (parser, ext) = registry.find_parser_for_file("data/Dt.cube").unwrap();
        assert_eq!(ext, "cube");
        assert_eq!(parser.name(), "Gaussian Cube Parser");
        assert!(registry.find_parser_for_file("no_extension").is_none());
    }

    #[test]
    fn supported_extensions_are_sorted_and_unique() {
        let registry = ParserRegistry::new();
        let extensions = registry.supported_extensions();
        assert!(extensions.contains(&"cube".to_string()));
        let mut sorted = extensions.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(extensions, sorted);
    }
}
