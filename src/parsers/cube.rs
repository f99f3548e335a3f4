use crate::utils::density_grid::{DensityGrid, GridAtom, GridMetadata};
use crate::utils::parser::DensityFileParser;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};

/// cube 文件解析错误
/// 解析器不重试、不猜测，遇到第一个违规立即失败
#[derive(Debug)]
pub enum CubeParseError {
    /// 头部行字段不足、首列不是整数、或轴点数为 0
    MalformedHeader { line: usize, reason: String },
    /// 数据块中的有效值少于 nx * ny * nz
    TruncatedData { expected: usize, found: usize },
    /// 数据块中出现无法解析为浮点数的 token
    MalformedToken { token: String },
    /// 底层 I/O 错误
    Io(io::Error),
}

impl fmt::Display for CubeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CubeParseError::MalformedHeader { line, reason } => {
                write!(f, "头部格式错误（第 {} 行）: {}", line, reason)
            }
            CubeParseError::TruncatedData { expected, found } => {
                write!(
                    f,
                    "数据块不完整: 需要 {} 个值，但只读到 {} 个",
                    expected, found
                )
            }
            CubeParseError::MalformedToken { token } => {
                write!(f, "无法解析数据值 '{}'", token)
            }
            CubeParseError::Io(err) => write!(f, "读取文件失败: {}", err),
        }
    }
}

impl std::error::Error for CubeParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CubeParseError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for CubeParseError {
    fn from(err: io::Error) -> Self {
        CubeParseError::Io(err)
    }
}

/// cube 文件头部信息（前 6 行）
struct CubeHeader {
    natm: usize,
    shape: [usize; 3],
    origin: [f64; 3],
    axis_counts: [i64; 3],
    axis_vectors: [[f64; 3]; 3],
}

/// 读取一行，EOF 时返回 None
fn next_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, CubeParseError> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// 读取一个"整数 + 若干浮点数"格式的头部/原子行
/// 返回 (首列整数标签, 剩余全部浮点字段)
fn read_tagged_line<R: BufRead>(
    reader: &mut R,
    line_no: usize,
) -> Result<(i64, Vec<f64>), CubeParseError> {
    let Some(line) = next_line(reader)? else {
        return Err(CubeParseError::MalformedHeader {
            line: line_no,
            reason: "文件提前结束".to_string(),
        });
    };

    let mut tokens = line.split_whitespace();
    let tag = match tokens.next() {
        Some(first) => first
            .parse::<i64>()
            .map_err(|_| CubeParseError::MalformedHeader {
                line: line_no,
                reason: format!("首列 '{}' 不是整数", first),
            })?,
        None => {
            return Err(CubeParseError::MalformedHeader {
                line: line_no,
                reason: "空行".to_string(),
            });
        }
    };

    let mut fields = Vec::new();
    for token in tokens {
        let value = token
            .parse::<f64>()
            .map_err(|_| CubeParseError::MalformedHeader {
                line: line_no,
                reason: format!("字段 '{}' 不是浮点数", token),
            })?;
        fields.push(value);
    }

    Ok((tag, fields))
}

/// 把头部行的浮点字段转成三维向量，字段不足视为格式错误
fn vector3(fields: &[f64], line_no: usize) -> Result<[f64; 3], CubeParseError> {
    if fields.len() < 3 {
        return Err(CubeParseError::MalformedHeader {
            line: line_no,
            reason: format!("需要 3 个浮点字段，但只有 {} 个", fields.len()),
        });
    }
    Ok([fields[0], fields[1], fields[2]])
}

/// 解析 cube 文件头部（两行注释 + 原点行 + 三个轴行）
fn parse_header<R: BufRead>(reader: &mut R) -> Result<CubeHeader, CubeParseError> {
    // 前两行是自由格式注释，直接跳过
    for line_no in 1..=2 {
        if next_line(reader)?.is_none() {
            return Err(CubeParseError::MalformedHeader {
                line: line_no,
                reason: "文件提前结束".to_string(),
            });
        }
    }

    let (natm, origin_fields) = read_tagged_line(reader, 3)?;
    if natm < 0 {
        return Err(CubeParseError::MalformedHeader {
            line: 3,
            reason: format!("原子数不能为负: {}", natm),
        });
    }
    let origin = vector3(&origin_fields, 3)?;

    let mut axis_counts = [0i64; 3];
    let mut axis_vectors = [[0f64; 3]; 3];
    let mut shape = [0usize; 3];
    for axis in 0..3 {
        let line_no = 4 + axis;
        let (count, vector_fields) = read_tagged_line(reader, line_no)?;
        // 负的轴点数是 cube 格式表示 Bohr 单位的约定，符号原样保留在元数据里
        // 点数为 0 则网格无意义
        if count == 0 {
            return Err(CubeParseError::MalformedHeader {
                line: line_no,
                reason: "轴点数不能为 0".to_string(),
            });
        }
        axis_counts[axis] = count;
        axis_vectors[axis] = vector3(&vector_fields, line_no)?;
        shape[axis] = count.unsigned_abs() as usize;
    }

    Ok(CubeHeader {
        natm: natm as usize,
        shape,
        origin,
        axis_counts,
        axis_vectors,
    })
}

/// 从任意可读流解析完整 cube 文件
///
/// 数据块按空白分割、忽略换行位置，共需 nx*ny*nz 个值，
/// 按 C 语言顺序填入网格（第 4 行声明的轴变化最慢，第 6 行声明的轴最快）。
/// 多余的尾部数据会被静默忽略，这是沿用已有工具的宽松行为，不视为错误。
pub fn parse_from_reader<R: BufRead>(
    mut reader: R,
) -> Result<(DensityGrid, GridMetadata), CubeParseError> {
    let header = parse_header(&mut reader)?;

    let mut atoms = Vec::with_capacity(header.natm);
    for i in 0..header.natm {
        let line_no = 7 + i;
        let (tag, fields) = read_tagged_line(&mut reader, line_no)?;
        atoms.push(GridAtom { tag, fields });
    }

    let total_elements = header.shape[0] * header.shape[1] * header.shape[2];
    let mut data = Vec::with_capacity(total_elements);

    'read: while data.len() < total_elements {
        let Some(line) = next_line(&mut reader)? else {
            break;
        };
        for token in line.split_whitespace() {
            if data.len() == total_elements {
                break 'read;
            }
            let value = token
                .parse::<f64>()
                .map_err(|_| CubeParseError::MalformedToken {
                    token: token.to_string(),
                })?;
            data.push(value);
        }
    }

    // 读取循环在凑满 total_elements 后即停止，长度校验失败只可能是数据不足
    let found = data.len();
    let grid =
        DensityGrid::new(header.shape, data).map_err(|_| CubeParseError::TruncatedData {
            expected: total_elements,
            found,
        })?;

    let metadata = GridMetadata {
        origin: header.origin,
        axis_counts: header.axis_counts,
        axis_vectors: header.axis_vectors,
        atoms,
    };

    Ok((grid, metadata))
}

/// Gaussian cube 文件格式解析器
pub struct CubeParser;

impl CubeParser {
    pub fn new() -> Self {
        CubeParser
    }
}

impl Default for CubeParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DensityFileParser for CubeParser {
    fn supported_extensions(&self) -> Vec<&'static str> {
        vec!["cube", "cub"]
    }

    fn name(&self) -> &'static str {
        "Gaussian Cube Parser"
    }

    fn parse_from_file(
        &self,
        file_path: &str,
    ) -> Result<(DensityGrid, GridMetadata), Box<dyn std::error::Error>> {
        // 打开失败也归入 CubeParseError::Io，调用方才能按错误种类区分处理
        let file = File::open(file_path).map_err(CubeParseError::Io)?;
        let reader = BufReader::new(file);
        let parsed = parse_from_reader(reader)?;
        Ok(parsed)
    }

    fn get_shape_from_file(
        &self,
        file_path: &str,
    ) -> Result<[usize; 3], Box<dyn std::error::Error>> {
        let file = File::open(file_path).map_err(CubeParseError::Io)?;
        let mut reader = BufReader::new(file);
        let header = parse_header(&mut reader)?;
        Ok(header.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
comment1
comment2
1 0.0 0.0 0.0
2 1.0 0.0 0.0
2 0.0 1.0 0.0
1 0.0 0.0 1.0
6 0.0 0.0 0.0
1.0 2.0 3.0 4.0 5.0 6.0
";

    #[test]
    fn parses_sample_cube() {
        let (grid, metadata) = parse_from_reader(SAMPLE.as_bytes()).unwrap();

        assert_eq!(grid.shape, [2, 2, 1]);
        assert_eq!(grid.data.len(), 4);
        assert_eq!(metadata.origin, [0.0, 0.0, 0.0]);
        assert_eq!(metadata.axis_counts, [2, 2, 1]);
        assert_eq!(metadata.axis_vectors[0], [1.0, 0.0, 0.0]);
        assert_eq!(metadata.axis_vectors[1], [0.0, 1.0, 0.0]);
        assert_eq!(metadata.axis_vectors[2], [0.0, 0.0, 1.0]);

        // C 语言顺序: 第 4 行的轴最慢，第 6 行的轴最快
        assert_eq!(grid.value_at(0, 0, 0), Some(1.0));
        assert_eq!(grid.value_at(0, 1, 0), Some(2.0));
        assert_eq!(grid.value_at(1, 0, 0), Some(3.0));
        assert_eq!(grid.value_at(1, 1, 0), Some(4.0));
    }

    #[test]
    fn atom_count_matches_header() {
        let (_, metadata) = parse_from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(metadata.atoms.len(), 1);
        assert_eq!(metadata.atoms[0].tag, 6);
        assert_eq!(metadata.atoms[0].fields, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn atom_lines_capture_all_trailing_floats() {
        // 原子行的浮点字段个数不固定，全部按浮点捕获
        let input = "\
c1
c2
2 0.1 0.2 0.3
1 1.0 0.0 0.0
1 0.0 1.0 0.0
1 0.0 0.0 1.0
8 8.0 0.0 0.0 0.5
1 1.0 0.5 0.5 0.5 9.9
0.25
";
        let (_, metadata) = parse_from_reader(input.as_bytes()).unwrap();
        assert_eq!(metadata.atoms.len(), 2);
        assert_eq!(metadata.atoms[0].fields.len(), 4);
        assert_eq!(metadata.atoms[1].fields.len(), 5);
    }

    #[test]
    fn truncated_data_is_an_error() {
        let input = SAMPLE.replace("1.0 2.0 3.0 4.0 5.0 6.0", "1.0 2.0 3.0");
        let err = parse_from_reader(input.as_bytes()).unwrap_err();
        match err {
            CubeParseError::TruncatedData { expected, found } => {
                assert_eq!(expected, 4);
                assert_eq!(found, 3);
            }
            other => panic!("期望 TruncatedData，实际为 {:?}", other),
        }
    }

    #[test]
    fn excess_data_tokens_are_ignored() {
        // shape 为 (2,2,1) 只需要 4 个值，后两个值被忽略
        let (grid, _) = parse_from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(grid.data, vec![1.0, 2.0, 3.0, 4.0]);

        // 多余部分即使不是数字也不报错，因为根本不会被读取
        let input = SAMPLE.replace("5.0 6.0", "5.0 oops");
        assert!(parse_from_reader(input.as_bytes()).is_ok());
    }

    #[test]
    fn malformed_data_token_is_an_error() {
        let input = SAMPLE.replace("3.0", "abc");
        let err = parse_from_reader(input.as_bytes()).unwrap_err();
        match err {
            CubeParseError::MalformedToken { token } => assert_eq!(token, "abc"),
            other => panic!("期望 MalformedToken，实际为 {:?}", other),
        }
    }

    #[test]
    fn data_block_is_whitespace_insensitive() {
        // 换行位置不同，解析结果必须一致
        let reflowed = SAMPLE.replace("1.0 2.0 3.0 4.0 5.0 6.0", "1.0\n2.0 3.0\n4.0 5.0 6.0");
        let (grid_a, _) = parse_from_reader(SAMPLE.as_bytes()).unwrap();
        let (grid_b, _) = parse_from_reader(reflowed.as_bytes()).unwrap();
        assert_eq!(grid_a.data, grid_b.data);
        assert_eq!(grid_a.shape, grid_b.shape);
    }

    #[test]
    fn header_with_missing_fields_is_rejected() {
        let input = SAMPLE.replace("2 1.0 0.0 0.0", "2 1.0 0.0");
        let err = parse_from_reader(input.as_bytes()).unwrap_err();
        assert!(matches!(err, CubeParseError::MalformedHeader { line: 4, .. }));
    }

    #[test]
    fn header_with_non_integer_lead_is_rejected() {
        let input = SAMPLE.replace("1 0.0 0.0 0.0\n2 1.0", "x 0.0 0.0 0.0\n2 1.0");
        let err = parse_from_reader(input.as_bytes()).unwrap_err();
        assert!(matches!(err, CubeParseError::MalformedHeader { line: 3, .. }));
    }

    #[test]
    fn missing_header_lines_are_rejected() {
        let input = "comment1\ncomment2\n1 0.0 0.0 0.0\n";
        let err = parse_from_reader(input.as_bytes()).unwrap_err();
        assert!(matches!(err, CubeParseError::MalformedHeader { line: 4, .. }));
    }

    #[test]
    fn negative_axis_count_sign_is_preserved() {
        // 负的轴点数表示 Bohr 单位，shape 取绝对值，符号透传到元数据
        let input = SAMPLE.replace("2 1.0 0.0 0.0", "-2 1.0 0.0 0.0");
        let (grid, metadata) = parse_from_reader(input.as_bytes()).unwrap();
        assert_eq!(grid.shape, [2, 2, 1]);
        assert_eq!(metadata.axis_counts, [-2, 2, 1]);
    }

    #[test]
    fn zero_axis_count_is_rejected() {
        let input = SAMPLE.replace("1 0.0 0.0 1.0\n6", "0 0.0 0.0 1.0\n6");
        let err = parse_from_reader(input.as_bytes()).unwrap_err();
        assert!(matches!(err, CubeParseError::MalformedHeader { line: 6, .. }));
    }

    #[test]
    fn negative_atom_count_is_rejected() {
        let input = SAMPLE.replace("1 0.0 0.0 0.0\n2 1.0", "-1 0.0 0.0 0.0\n2 1.0");
        let err = parse_from_reader(input.as_bytes()).unwrap_err();
        assert!(matches!(err, CubeParseError::MalformedHeader { line: 3, .. }));
    }

    #[test]
    fn scientific_notation_values_are_parsed() {
        let input = SAMPLE.replace(
            "1.0 2.0 3.0 4.0 5.0 6.0",
            "0.13387E-02 -1.1782E+01 3e0 4.0",
        );
        let (grid, _) = parse_from_reader(input.as_bytes()).unwrap();
        assert_eq!(grid.data, vec![0.13387e-2, -1.1782e1, 3.0, 4.0]);
    }

    #[test]
    fn parser_trait_reads_from_file() {
        let dir = std::env::temp_dir();
        let path = dir.join("cube_parser_trait_test.cube");
        std::fs::write(&path, SAMPLE).unwrap();

        let parser = CubeParser::new();
        let path_str = path.to_str().unwrap();

        let shape = parser.get_shape_from_file(path_str).unwrap();
        assert_eq!(shape, [2, 2, 1]);

        let (grid, metadata) = parser.parse_from_file(path_str).unwrap();
        assert_eq!(grid.shape, shape);
        assert_eq!(metadata.atoms.len(), 1);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_surfaces_io_variant() {
        // 文件打不开时错误必须能向下转型为 CubeParseError::Io
        let parser = CubeParser::new();

        let err = parser
            .parse_from_file("no_such_dir/missing.cube")
            .unwrap_err();
        match err.downcast_ref::<CubeParseError>() {
            Some(CubeParseError::Io(_)) => {}
            other => panic!("期望 Io 错误，实际为 {:?}", other),
        }

        let err = parser
            .get_shape_from_file("no_such_dir/missing.cube")
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CubeParseError>(),
            Some(CubeParseError::Io(_))
        ));
    }

    #[test]
    fn get_shape_ignores_data_block() {
        // 数据块被截断也不影响 shape 读取
        let truncated = SAMPLE.replace("1.0 2.0 3.0 4.0 5.0 6.0", "");
        let dir = std::env::temp_dir();
        let path = dir.join("cube_parser_shape_test.cube");
        std::fs::write(&path, truncated).unwrap();

        let parser = CubeParser::new();
        let shape = parser.get_shape_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(shape, [2, 2, 1]);

        std::fs::remove_file(&path).unwrap();
    }
}
