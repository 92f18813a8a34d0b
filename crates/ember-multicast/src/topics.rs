//! `spec.md` §4.6 "extract `#[a-z0-9_]+` tokens, lowercase, deduplicate...
//! empty extract to a default `#general`."

pub const DEFAULT_TOPIC: &str = "general";

pub fn extract_topics(content: &str) -> Vec<String> {
    let mut topics = Vec::new();
    let mut chars = content.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if c != '#' {
            continue;
        }
        let mut token = String::new();
        while let Some(&(_, next)) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                token.push(next.to_ascii_lowercase());
                chars.next();
            } else {
                break;
            }
        }
        if !token.is_empty() && !topics.contains(&token) {
            topics.push(token);
        }
    }
    if topics.is_empty() {
        topics.push(DEFAULT_TOPIC.to_string());
    }
    topics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_and_lowercases_hashtags() {
        let topics = extract_topics("hello #Rust and #RUST again, also #web3");
        assert_eq!(topics, vec!["rust".to_string(), "web3".to_string()]);
    }

    #[test]
    fn falls_back_to_general_when_no_hashtags() {
        assert_eq!(extract_topics("just plain text"), vec![DEFAULT_TOPIC.to_string()]);
    }

    #[test]
    fn ignores_bare_hash_with_no_token() {
        assert_eq!(extract_topics("look at this # right here"), vec![DEFAULT_TOPIC.to_string()]);
    }
}
