// NOTE label names in this file are part of the wire contract with the
// history store. Streams written under one name are invisible to queries
// using another; treat renames as breaking.

// Structural labels identifying the rule that owns a stream. The recorder
// injects these into every stream and they always win over a same-named
// label supplied by the rule itself.
pub const ORG_ID: &str = "orgID";
pub const RULE_UID: &str = "ruleUID";
pub const GROUP: &str = "group";
pub const FOLDER_UID: &str = "folderUID";

pub mod encode;
pub mod parse;

/// A single name/value pair attached to a stream.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Label {
    pub name: String,
    pub value: String,
}

/// An ordered mapping of label names to values.
/// Labels are kept sorted by name, and names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<Label>,
}

/// Whether `name` is reserved for internal bookkeeping. Private labels must
/// never leave the process as ordinary stream labels.
pub fn is_private(name: &str) -> bool {
    name.starts_with("__") || name.ends_with("__")
}

/// Build a LabelSet from the input iterator of label names and values.
/// When a name appears more than once, the last value wins.
pub fn build_set<I, S>(it: I) -> LabelSet
where
    I: IntoIterator<Item = (S, S)>,
    S: AsRef<str>,
{
    let mut set = LabelSet::default();
    for (name, value) in it {
        set.set_value(name.as_ref(), value.as_ref());
    }
    set
}

impl LabelSet {
    /// Retrieve the value of the label with the given `name`, if present.
    pub fn value(&self, name: &str) -> Option<&str> {
        match self.position(name) {
            Ok(index) => Some(&self.labels[index].value),
            Err(_) => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_ok()
    }

    /// Set the label `name` to `value`, replacing any current value.
    pub fn set_value(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Ok(index) => self.labels[index].value = value.to_string(),
            Err(index) => self.labels.insert(
                index,
                Label {
                    name: name.to_string(),
                    value: value.to_string(),
                },
            ),
        }
    }

    /// Remove the label `name`, if present.
    pub fn remove(&mut self, name: &str) {
        if let Ok(index) = self.position(name) {
            self.labels.remove(index);
        }
    }

    /// Return a copy of this set with all private labels removed.
    /// Sanitizing an already-clean set returns an equal set.
    pub fn without_private(&self) -> LabelSet {
        LabelSet {
            labels: self
                .labels
                .iter()
                .filter(|label| !is_private(&label.name))
                .cloned()
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn position(&self, name: &str) -> Result<usize, usize> {
        self.labels
            .binary_search_by(|probe| probe.name.as_str().cmp(name))
    }
}

// LabelSets serialize as a flat JSON object, which is the form the history
// store's push API expects for a stream's labels.
impl serde::Serialize for LabelSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.labels.len()))?;
        for label in &self.labels {
            map.serialize_entry(&label.name, &label.value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod test {
    use crate::*;

    #[test]
    fn mutation_cases() {
        let mut set = build_set([("a", "aa"), ("c", "cc"), ("d", "dd"), ("z", "")]);
        let set = &mut set;

        assert_sorted(set);

        set.set_value("a", "aa.2");
        set.set_value("b", "bb.1");
        set.set_value("d", "dd.2");
        set.remove("c");
        set.remove("z");
        set.remove("not-present");

        assert_sorted(set);

        insta::assert_json_snapshot!(set, @r###"
        {
          "a": "aa.2",
          "b": "bb.1",
          "d": "dd.2"
        }
        "###);
    }

    #[test]
    fn lookup_cases() {
        let set = build_set([("alertname", "HighLatency"), ("severity", "warn")]);

        assert_eq!(set.value("alertname"), Some("HighLatency"));
        assert_eq!(set.value("severity"), Some("warn"));
        assert_eq!(set.value("missing"), None);
        assert!(set.contains("severity"));
        assert!(!set.contains("sev"));
    }

    #[test]
    fn build_set_last_value_wins() {
        let set = build_set([("a", "1"), ("b", "2"), ("a", "3")]);
        assert_eq!(set.value("a"), Some("3"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn construction_order_is_irrelevant() {
        let forward = build_set([("a", "1"), ("b", "2"), ("c", "3")]);
        let reverse = build_set([("c", "3"), ("b", "2"), ("a", "1")]);
        assert_eq!(forward, reverse);
    }

    #[test]
    fn private_labels_are_stripped() {
        let set = build_set([
            ("__name__", "up"),
            ("alertname", "HighLatency"),
            ("private__", "x"),
            ("severity", "warn"),
        ]);

        let clean = set.without_private();
        assert_eq!(
            clean,
            build_set([("alertname", "HighLatency"), ("severity", "warn")])
        );

        // Sanitizing again is a no-op.
        assert_eq!(clean.without_private(), clean);
    }

    #[test]
    fn sanitizing_empty_set_is_empty() {
        assert_eq!(LabelSet::default().without_private(), LabelSet::default());
    }

    fn assert_sorted(set: &LabelSet) {
        for pair in set.labels.windows(2) {
            assert!(pair[0].name < pair[1].name);
        }
    }
}
