//! # Features Esparsas por Token
//!
//! Cada token da sentença ativa um pequeno conjunto de features binárias,
//! representadas apenas pelo nome (`"word=paris"`, `"suffix3=ris"`). O espaço é
//! aberto e esparso: só os nomes ativos são guardados.
//!
//! ## Features
//!
//! - Forma da palavra em minúsculas e sua forma ortográfica (`Xxxx`, `dd`)
//! - Capitalização, dígitos, hífen, pontuação
//! - Prefixos e sufixos de 2 a 4 caracteres
//! - Palavras vizinhas em janela de 2 tokens e o bigrama ao redor
//! - Início e fim de sentença
//!
//! A tag prevista para o token anterior não entra aqui: ela depende da
//! decodificação e é acrescentada pelo etiquetador (ver [`previous_tag_feature`]).

/// Features de todos os tokens, alinhadas por índice.
pub fn sentence_features(tokens: &[String]) -> Vec<Vec<String>> {
    (0..tokens.len()).map(|i| token_features(tokens, i)).collect()
}

/// Features do token `i` em seu contexto.
pub fn token_features(tokens: &[String], i: usize) -> Vec<String> {
    let word = tokens[i].as_str();
    let lower = word.to_lowercase();
    let mut features = vec!["bias".to_string(), format!("word={lower}"), format!("shape={}", word_shape(word))];

    if word.chars().next().is_some_and(char::is_uppercase) {
        features.push("is_capitalized".to_string());
    }
    if word.chars().count() > 1 && word.chars().all(|c| c.is_uppercase() || !c.is_alphabetic()) {
        features.push("is_all_caps".to_string());
    }
    if word.chars().skip(1).any(char::is_uppercase) {
        features.push("is_mixed_case".to_string());
    }
    if word.chars().all(char::is_numeric) {
        features.push("is_digit".to_string());
    } else if word.chars().any(char::is_numeric) {
        features.push("has_digit".to_string());
    }
    if word.contains('-') {
        features.push("has_hyphen".to_string());
    }
    if !word.is_empty() && word.chars().all(|c| !c.is_alphanumeric()) {
        features.push("is_punctuation".to_string());
    }

    let chars: Vec<char> = lower.chars().collect();
    for n in 2..=4 {
        if chars.len() >= n {
            let prefix: String = chars[..n].iter().collect();
            let suffix: String = chars[chars.len() - n..].iter().collect();
            features.push(format!("prefix{n}={prefix}"));
            features.push(format!("suffix{n}={suffix}"));
        }
    }

    // Janela de contexto
    match i.checked_sub(1).map(|p| &tokens[p]) {
        Some(prev) => {
            features.push(format!("prev_word={}", prev.to_lowercase()));
            if prev.chars().next().is_some_and(char::is_uppercase) {
                features.push("prev_is_capitalized".to_string());
            }
        }
        None => features.push("BOS".to_string()),
    }
    if i > 1 {
        features.push(format!("prev2_word={}", tokens[i - 2].to_lowercase()));
    }
    match tokens.get(i + 1) {
        Some(next) => {
            features.push(format!("next_word={}", next.to_lowercase()));
            if next.chars().next().is_some_and(char::is_uppercase) {
                features.push("next_is_capitalized".to_string());
            }
        }
        None => features.push("EOS".to_string()),
    }
    if let Some(next2) = tokens.get(i + 2) {
        features.push(format!("next2_word={}", next2.to_lowercase()));
    }
    if i > 0 && i + 1 < tokens.len() {
        features.push(format!(
            "bigram={}_{}",
            tokens[i - 1].to_lowercase(),
            tokens[i + 1].to_lowercase()
        ));
    }

    features
}

/// Feature de transição: a tag atribuída ao token anterior (`<s>` no início).
pub fn previous_tag_feature(previous: Option<&str>) -> String {
    format!("prev_tag={}", previous.unwrap_or("<s>"))
}

/// Forma ortográfica compacta: maiúsculas viram `X`, minúsculas `x`, dígitos `d`,
/// com repetições consecutivas colapsadas ("Paris" -> "Xx", "2024" -> "d").
fn word_shape(word: &str) -> String {
    let mut shape = String::new();
    for c in word.chars() {
        let class = if c.is_uppercase() {
            'X'
        } else if c.is_lowercase() {
            'x'
        } else if c.is_numeric() {
            'd'
        } else {
            c
        };
        if !shape.ends_with(class) {
            shape.push(class);
        }
    }
    shape
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_capitalization_feature() {
        let features = sentence_features(&toks("John lives in Paris"));
        assert!(features[0].contains(&"is_capitalized".to_string()));
        assert!(!features[1].contains(&"is_capitalized".to_string()));
    }

    #[test]
    fn test_prefix_suffix_features() {
        let features = token_features(&toks("Petrobras"), 0);
        assert!(features.contains(&"prefix2=pe".to_string()));
        assert!(features.contains(&"suffix3=ras".to_string()));
        assert!(features.contains(&"BOS".to_string()));
        assert!(features.contains(&"EOS".to_string()));
    }

    #[test]
    fn test_context_features() {
        let features = token_features(&toks("the president Obama announced"), 2);
        assert!(features.contains(&"prev_word=president".to_string()));
        assert!(features.contains(&"next_word=announced".to_string()));
        assert!(features.contains(&"bigram=president_announced".to_string()));
    }

    #[test]
    fn test_word_shape() {
        assert_eq!(word_shape("Paris"), "Xx");
        assert_eq!(word_shape("U.S."), "X.X.");
        assert_eq!(word_shape("2024"), "d");
        assert_eq!(previous_tag_feature(None), "prev_tag=<s>");
    }
}
