use serde::{Deserialize, Serialize};

/// Per-field allowed-value sets for a filtered load.
///
/// Values within one field are alternatives (set membership); constrained
/// fields combine with AND. An empty set leaves its field unconstrained.
/// Values are matched literally — a set containing `""` matches rows whose
/// field is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyFilter {
    pub p_type: Vec<String>,
    pub v0: Vec<String>,
    pub v1: Vec<String>,
    pub v2: Vec<String>,
    pub v3: Vec<String>,
    pub v4: Vec<String>,
    pub v5: Vec<String>,
}

impl PolicyFilter {
    /// The field sets paired with their positional field names, in
    /// `p_type, v0..v5` order.
    pub fn fields(&self) -> [(&'static str, &[String]); 7] {
        [
            ("p_type", &self.p_type),
            ("v0", &self.v0),
            ("v1", &self.v1),
            ("v2", &self.v2),
            ("v3", &self.v3),
            ("v4", &self.v4),
            ("v5", &self.v5),
        ]
    }

    /// True when no field is constrained, i.e. the filter matches everything.
    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, values)| values.is_empty())
    }
}
