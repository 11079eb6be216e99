use std::path::{Path, PathBuf};

use crate::download::models::ChapterNumber;

/// 标题中不能出现在目录名里的字符，统一替换为 `_`。
const FORBIDDEN: [char; 7] = [':', '?', '/', '<', '>', '+', '='];

pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|ch| if FORBIDDEN.contains(&ch) { '_' } else { ch })
        .collect()
}

/// `<root>/<title>/Chapter <N>`，`N` 不补零，续传判断依赖该路径。
pub fn chapter_base_path(root: &Path, title: &str, number: &ChapterNumber) -> PathBuf {
    root.join(title).join(format!("Chapter {number}"))
}

pub fn archive_path(base: &Path) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(".cbz");
    PathBuf::from(name)
}

pub fn asset_file_name(index: usize, extension: &str) -> String {
    format!("{index:02}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_characters_become_underscores() {
        assert_eq!(sanitize_title("Demo: Test/One"), "Demo_ Test_One");
        assert_eq!(sanitize_title("a?b<c>d+e=f"), "a_b_c_d_e_f");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let once = sanitize_title("Re:Zero / Side+Story = <1>?");
        assert_eq!(sanitize_title(&once), once);
    }

    #[test]
    fn chapter_paths_keep_number_unpadded() {
        let root = Path::new("out");
        let base = chapter_base_path(root, "Example Manga", &ChapterNumber::Whole(7));
        assert_eq!(base, Path::new("out/Example Manga/Chapter 7"));
        assert_eq!(
            archive_path(&base),
            Path::new("out/Example Manga/Chapter 7.cbz")
        );

        let base = chapter_base_path(root, "X", &ChapterNumber::Fractional(12.5));
        assert_eq!(base, Path::new("out/X/Chapter 12.5"));
    }

    #[test]
    fn asset_names_are_two_digit() {
        assert_eq!(asset_file_name(1, "jpg"), "01.jpg");
        assert_eq!(asset_file_name(12, "jpg"), "12.jpg");
        assert_eq!(asset_file_name(123, "png"), "123.png");
    }
}
