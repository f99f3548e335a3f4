use serde::Serialize;

/// 密度网格数据结构
/// 表示三维规则网格上的标量场（如电子密度）
#[derive(Debug, Clone)]
pub struct DensityGrid {
    /// 网格维度 [nx, ny, nz]
    pub shape: [usize; 3],
    /// 数据数组，按 C 语言顺序存储 (z变化最快，y其次，x最慢)
    /// 索引计算: index = i * ny * nz + j * nz + k
    pub data: Vec<f64>,
}

/// 网格的一个二维切片
#[derive(Debug, Clone, Serialize)]
pub struct DensitySlice {
    /// 切片维度 [行数, 列数]
    pub shape: [usize; 2],
    /// 按行存储的切片数据
    pub rows: Vec<Vec<f64>>,
}

/// 接近等值面的采样点
/// 对应原始流程中在等密度线附近打散点标记的位置
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IsoMarker {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

/// 网格几何与原子信息
/// 来自体积数据文件头部，与标量数据一起返回
#[derive(Debug, Clone, Serialize)]
pub struct GridMetadata {
    /// 网格原点（真实空间坐标）
    pub origin: [f64; 3],
    /// 各轴的原始点数，保留文件中的符号
    /// cube 格式约定负值表示 Bohr 单位，这里只透传不解释
    pub axis_counts: [i64; 3],
    /// 各轴的步进向量 [xvec, yvec, zvec]
    pub axis_vectors: [[f64; 3]; 3],
    /// 原子列表，长度等于头部声明的原子数
    pub atoms: Vec<GridAtom>,
}

/// 单个原子记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridAtom {
    /// 首列整数标签（通常是原子序数，但不做校验）
    pub tag: i64,
    /// 该行剩余的全部浮点字段（坐标、电荷等，个数不固定）
    pub fields: Vec<f64>,
}

impl DensityGrid {
    /// 创建新的密度网格
    pub fn new(shape: [usize; 3], data: Vec<f64>) -> Result<Self, String> {
        let total_elements = shape[0] * shape[1] * shape[2];

        if data.len() != total_elements {
            return Err(format!(
                "数据量不匹配: shape {:?} 需要 {} 个元素，但提供了 {} 个",
                shape,
                total_elements,
                data.len()
            ));
        }

        Ok(DensityGrid { shape, data })
    }

    /// 获取整个数据向量的引用
    pub fn get_data(&self) -> &Vec<f64> {
        &self.data
    }

    /// 按 (i, j, k) 读取单个网格点
    #[allow(dead_code)]
    pub fn value_at(&self, i: usize, j: usize, k: usize) -> Option<f64> {
        let [nx, ny, nz] = self.shape;
        if i >= nx || j >= ny || k >= nz {
            return None;
        }
        Some(self.data[i * ny * nz + j * nz + k])
    }

    /// 沿指定轴取二维切片
    /// axis: 0/1/2 对应 x/y/z 轴；index: 在该轴上的位置
    /// 例如 axis=0, index=60 相当于取 data[60, :, :]
    pub fn slice_along_axis(&self, axis: usize, index: usize) -> Result<DensitySlice, String> {
        let [nx, ny, nz] = self.shape;

        if axis > 2 {
            return Err(format!("无效的轴: {}，应为 0、1 或 2", axis));
        }
        if index >= self.shape[axis] {
            return Err(format!(
                "切片位置越界: 轴 {} 的长度为 {}，但请求了位置 {}",
                axis, self.shape[axis], index
            ));
        }

        let slice = match axis {
            0 => {
                let mut rows = Vec::with_capacity(ny);
                for j in 0..ny {
                    let start = index * ny * nz + j * nz;
                    rows.push(self.data[start..start + nz].to_vec());
                }
                DensitySlice {
                    shape: [ny, nz],
                    rows,
                }
            }
            1 => {
                let mut rows = Vec::with_capacity(nx);
                for i in 0..nx {
                    let start = i * ny * nz + index * nz;
                    rows.push(self.data[start..start + nz].to_vec());
                }
                DensitySlice {
                    shape: [nx, nz],
                    rows,
                }
            }
            _ => {
                let mut rows = Vec::with_capacity(nx);
                for i in 0..nx {
                    let mut row = Vec::with_capacity(ny);
                    for j in 0..ny {
                        row.push(self.data[i * ny * nz + j * nz + index]);
                    }
                    rows.push(row);
                }
                DensitySlice {
                    shape: [nx, ny],
                    rows,
                }
            }
        };

        Ok(slice)
    }
}

impl DensitySlice {
    /// 找出切片中接近等值 iso 的所有点
    /// 判定条件与 numpy 的 isclose 一致: |v - iso| <= atol + rtol * |iso|
    /// atol 固定为 1e-8，rtol 由调用方给出（原始流程使用 0.03）
    pub fn iso_markers(&self, iso: f64, rtol: f64) -> Vec<IsoMarker> {
        const ATOL: f64 = 1e-8;
        let tolerance = ATOL + rtol * iso.abs();

        let mut markers = Vec::new();
        for (row, values) in self.rows.iter().enumerate() {
            for (col, &value) in values.iter().enumerate() {
                if (value - iso).abs() <= tolerance {
                    markers.push(IsoMarker { row, col, value });
                }
            }
        }
        markers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid() -> DensityGrid {
        // shape (2, 3, 2)，数据为 0..12，z 变化最快
        DensityGrid::new([2, 3, 2], (0..12).map(f64::from).collect()).unwrap()
    }

    #[test]
    fn new_rejects_length_mismatch() {
        let result = DensityGrid::new([2, 2, 2], vec![0.0; 7]);
        assert!(result.is_err());
    }

    #[test]
    fn value_at_follows_c_order() {
        let grid = sample_grid();
        assert_eq!(grid.value_at(0, 0, 0), Some(0.0));
        assert_eq!(grid.value_at(0, 0, 1), Some(1.0));
        assert_eq!(grid.value_at(0, 1, 0), Some(2.0));
        assert_eq!(grid.value_at(1, 0, 0), Some(6.0));
        assert_eq!(grid.value_at(1, 2, 1), Some(11.0));
        assert_eq!(grid.value_at(2, 0, 0), None);
    }

    #[test]
    fn slice_along_x_axis() {
        let grid = sample_grid();
        let slice = grid.slice_along_axis(0, 1).unwrap();
        assert_eq!(slice.shape, [3, 2]);
        assert_eq!(slice.rows[0], vec![6.0, 7.0]);
        assert_eq!(slice.rows[2], vec![10.0, 11.0]);
    }

    #[test]
    fn slice_along_y_axis() {
        let grid = sample_grid();
        let slice = grid.slice_along_axis(1, 2).unwrap();
        assert_eq!(slice.shape, [2, 2]);
        assert_eq!(slice.rows[0], vec![4.0, 5.0]);
        assert_eq!(slice.rows[1], vec![10.0, 11.0]);
    }

    #[test]
    fn slice_along_z_axis() {
        let grid = sample_grid();
        let slice = grid.slice_along_axis(2, 0).unwrap();
        assert_eq!(slice.shape, [2, 3]);
        assert_eq!(slice.rows[0], vec![0.0, 2.0, 4.0]);
        assert_eq!(slice.rows[1], vec![6.0, 8.0, 10.0]);
    }

    #[test]
    fn slice_rejects_bad_axis_or_index() {
        let grid = sample_grid();
        assert!(grid.slice_along_axis(3, 0).is_err());
        assert!(grid.slice_along_axis(0, 2).is_err());
    }

    #[test]
    fn iso_markers_respect_relative_tolerance() {
        let slice = DensitySlice {
            shape: [2, 2],
            rows: vec![vec![0.020, 0.0206], vec![0.0194, 0.5]],
        };
        // rtol = 0.03 时容差约为 0.0006，前三个值都在等值线附近
        let markers = slice.iso_markers(0.020, 0.03);
        assert_eq!(markers.len(), 3);
        assert_eq!(
            markers[0],
            IsoMarker {
                row: 0,
                col: 0,
                value: 0.020
            }
        );
        assert!(markers.iter().all(|m| !(m.row == 1 && m.col == 1)));
    }

    #[test]
    fn iso_markers_empty_when_nothing_close() {
        let slice = DensitySlice {
            shape: [1, 2],
            rows: vec![vec![1.0, 2.0]],
        };
        assert!(slice.iso_markers(0.02, 0.03).is_empty());
    }
}
