/// 清理 RUT：只保留數字與驗證碼 `k`/`K`，並轉為小寫
///
/// `"12.345.678-K"` 與 `"12345678k"` 都會變成 `"12345678k"`。
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, 'k' | 'K'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
