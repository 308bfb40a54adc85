//! `tres` ("trackable resources") list formatting.

/// Given a prefix `p` and a user-supplied comma list such as
/// `"a,b=2,c:3"`, emit `"p:a,p:b=2,p:c:3"` — every comma-separated
/// token gets the prefix spliced in front of it, unchanged otherwise.
pub fn format_tres_list(prefix: &str, list: &str) -> String {
    list.split(',')
        .map(|tok| format!("{prefix}:{tok}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_every_token() {
        assert_eq!(
            format_tres_list("gres", "a,b=2,c:3"),
            "gres:a,gres:b=2,gres:c:3"
        );
    }

    #[test]
    fn single_token() {
        assert_eq!(format_tres_list("gres", "gpu:2"), "gres:gpu:2");
    }
}
