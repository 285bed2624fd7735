/// Result text classification: does a revealed result count as a win?
/// Only picks the jingle; the text itself is shown as-is.

const WIN_KEYWORDS: &[&str] = &["win", "winner", "당첨", "성공", "승리", "1등", "2등", "3등"];

pub fn is_win_result(result: &str) -> bool {
    let lower = result.to_lowercase();
    WIN_KEYWORDS.iter().any(|k| lower.contains(k))
}
