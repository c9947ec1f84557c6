use docrag_core::types::ScoredText;

/// Render the user turn sent to the generator.
pub fn build_prompt(query: &str, context: &str) -> String {
    format!("User : {query}\nContext:\n{context}\nAnswer :")
}

/// Hit texts in rank order joined by `delimiter`; no hits give `""`.
pub fn join_context(hits: &[ScoredText], delimiter: &str) -> String {
    hits.iter().map(|h| h.text.as_str()).collect::<Vec<_>>().join(delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(text: &str) -> ScoredText {
        ScoredText { text: text.into(), source: "a.txt".into(), score: 0.5 }
    }

    #[test]
    fn prompt_layout() {
        assert_eq!(
            build_prompt("Are cats mammals?", "cats are mammals"),
            "User : Are cats mammals?\nContext:\ncats are mammals\nAnswer :"
        );
        assert_eq!(build_prompt("q", ""), "User : q\nContext:\n\nAnswer :");
    }

    #[test]
    fn context_keeps_rank_order() {
        let hits = [hit("first"), hit("second")];
        assert_eq!(join_context(&hits, ","), "first,second");
        assert_eq!(join_context(&hits, "\n---\n"), "first\n---\nsecond");
        assert_eq!(join_context(&[], ","), "");
    }
}
