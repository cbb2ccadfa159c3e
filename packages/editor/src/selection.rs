//! Selected nodes: one active node plus an ordered multi-selection.

/// Invariant: `active` is always a member of the set when set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    active: Option<String>,
    ids: Vec<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Selected ids in selection order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Replace the selection with a single node, or clear it
    pub fn select(&mut self, id: Option<&str>) {
        self.ids.clear();
        self.active = id.map(str::to_string);
        if let Some(id) = id {
            self.ids.push(id.to_string());
        }
    }

    /// Add or remove `id` from the multi-selection
    ///
    /// Removing the last member is refused; returns whether anything changed.
    pub fn toggle(&mut self, id: &str) -> bool {
        match self.ids.iter().position(|s| s == id) {
            Some(_) if self.ids.len() == 1 => false,
            Some(index) => {
                self.ids.remove(index);
                if self.active.as_deref() == Some(id) {
                    self.active = self.ids.last().cloned();
                }
                true
            }
            None => {
                self.ids.push(id.to_string());
                if self.active.is_none() {
                    self.active = Some(id.to_string());
                }
                true
            }
        }
    }

    /// Drop removed nodes from the selection
    pub fn deselect<'a>(&mut self, removed: impl IntoIterator<Item = &'a str>) {
        let removed: Vec<&str> = removed.into_iter().collect();
        self.ids.retain(|id| !removed.contains(&id.as_str()));
        if self
            .active
            .as_deref()
            .is_some_and(|active| removed.contains(&active))
        {
            self.active = self.ids.last().cloned();
        }
    }

    pub fn clear(&mut self) {
        self.select(None);
    }
}
