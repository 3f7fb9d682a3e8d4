use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// 处理流程中可能出现的错误
///
/// 单条记录级别的错误（`UnreadableImage`、某一行 CSV 格式错误）只会让该记录被跳过，
/// 其余错误会让当前阶段放弃输出。
#[derive(Debug, Error)]
pub enum Error {
    /// 输入文件或目录不存在
    #[error("输入不存在: {}", .0.display())]
    MissingInput(PathBuf),
    /// 无法解析的 JSON / CSV，或缺少必需字段
    #[error("输入格式错误: {0}")]
    MalformedInput(String),
    /// 单张图片解码失败
    #[error("无法读取图片 {}: {reason}", path.display())]
    UnreadableImage { path: PathBuf, reason: String },
    /// 样本过少、方差为零等导致数值计算无法进行
    #[error("数值输入退化: {0}")]
    DegenerateNumericInput(String),
    /// 数值例程失败或返回了意外的形状
    #[error("数值计算失败: {0}")]
    ExternalToolFailure(String),
    /// 写出结果文件失败
    #[error("无法写入 {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }

    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateNumericInput(msg.into())
    }

    /// 是否只影响单条记录，其余错误会中止当前阶段
    pub fn is_per_record(&self) -> bool {
        matches!(self, Self::UnreadableImage { .. })
    }
}
