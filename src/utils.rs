use std::path::{Path, PathBuf};

use indicatif::ProgressStyle;

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
        .expect("failed to build progress style")
        .progress_chars("##-")
}

/// 计算输出文件路径
///
/// `output` 为绝对路径时直接使用，否则放在 `output_dir` 下；
/// 未指定 `output_dir` 时使用输入文件所在目录。
pub fn output_path(output_dir: Option<&Path>, input: &Path, output: &Path) -> PathBuf {
    if output.is_absolute() {
        return output.to_path_buf();
    }
    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf(),
    };
    dir.join(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_next_to_input() {
        let path = output_path(None, Path::new("out/meta.json"), Path::new("colors.json"));
        assert_eq!(path, PathBuf::from("out/colors.json"));
    }

    #[test]
    fn output_in_current_dir() {
        let path = output_path(None, Path::new("meta.json"), Path::new("colors.json"));
        assert_eq!(path, PathBuf::from("./colors.json"));
    }

    #[test]
    fn output_dir_override() {
        let path = output_path(Some(Path::new("/tmp/x")), Path::new("out/meta.json"), Path::new("c.json"));
        assert_eq!(path, PathBuf::from("/tmp/x/c.json"));
    }

    #[test]
    fn absolute_output() {
        let path = output_path(Some(Path::new("/tmp/x")), Path::new("m.json"), Path::new("/abs/c.json"));
        assert_eq!(path, PathBuf::from("/abs/c.json"));
    }
}
