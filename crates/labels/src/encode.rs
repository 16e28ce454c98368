use crate::LabelSet;

/// Render `set` in its canonical string form, e.g. `{alertname="A", severity="warn"}`.
///
/// Equal sets always render identically, so the rendering doubles as a
/// collision-free grouping key. Values have `\`, `"` and newline escaped;
/// `parse::label_set` inverts the rendering exactly.
pub fn canonical(set: &LabelSet) -> String {
    let mut out = String::with_capacity(2 + 16 * set.len());
    out.push('{');

    for (index, label) in set.iter().enumerate() {
        if index != 0 {
            out.push_str(", ");
        }
        out.push_str(&label.name);
        out.push_str("=\"");
        for c in label.value.chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                '"' => out.push_str("\\\""),
                '\n' => out.push_str("\\n"),
                c => out.push(c),
            }
        }
        out.push('"');
    }

    out.push('}');
    out
}

#[cfg(test)]
mod test {
    use super::canonical;
    use crate::{build_set, LabelSet};

    #[test]
    fn canonical_form() {
        let set = build_set([
            ("severity", "warn"),
            ("alertname", "HighLatency"),
            ("team", "sre"),
        ]);

        insta::assert_snapshot!(canonical(&set), @r###"{alertname="HighLatency", severity="warn", team="sre"}"###);
    }

    #[test]
    fn canonical_escapes_values() {
        let set = build_set([("msg", "a \"quoted\"\nback\\slash")]);

        insta::assert_snapshot!(canonical(&set), @r###"{msg="a \"quoted\"\nback\\slash"}"###);
    }

    #[test]
    fn empty_set() {
        assert_eq!(canonical(&LabelSet::default()), "{}");
    }

    #[test]
    fn equal_sets_render_equal() {
        let one = build_set([("a", "1"), ("b", "2")]);
        let two = build_set([("b", "2"), ("a", "1")]);
        assert_eq!(canonical(&one), canonical(&two));
    }

    #[test]
    fn unequal_sets_render_unequal() {
        let one = build_set([("a", "1"), ("b", "2")]);
        let two = build_set([("a", "1"), ("b", "3")]);
        assert_ne!(canonical(&one), canonical(&two));
    }
}
