use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(u64);

/// The popup menu of the indicator as seen by the registry.
///
/// Positions are ordinal among the sensor items only; fixed entries such as
/// the preferences action are not counted.
pub trait MenuSurface {
    /// Insert a checkable radio-style item at `position` and return its handle.
    fn insert_item(&mut self, position: usize) -> ItemId;
    fn remove_item(&mut self, item: ItemId);
    fn set_item_label(&mut self, item: ItemId, text: &str);
    fn set_item_active(&mut self, item: ItemId, active: bool);
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub id: ItemId,
    pub label: String,
    pub active: bool,
}

// Fixed actions shown below the separator
const ACTIONS: &[&str] = &["Preferences"];

/// In-memory menu rendered as plain text.
#[derive(Debug, Default)]
pub struct TextMenu {
    items: Vec<MenuItem>,
    next_id: u64,
}

impl TextMenu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&MenuItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Handle of the sensor item at a zero based index.
    pub fn item_at(&self, index: usize) -> Option<ItemId> {
        self.items.get(index).map(|item| item.id)
    }

    pub fn active_items(&self) -> Vec<ItemId> {
        self.items.iter().filter(|item| item.active).map(|item| item.id).collect()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (index, item) in self.items.iter().enumerate() {
            let mark = if item.active { "(*)" } else { "( )" };
            out.push_str(&format!("{} {}. {}\n", mark, index + 1, item.label));
        }
        out.push_str("----\n");
        for action in ACTIONS {
            out.push_str(&format!("    {}\n", action));
        }
        out
    }

    fn item_mut(&mut self, id: ItemId) -> Option<&mut MenuItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }
}

impl MenuSurface for TextMenu {
    fn insert_item(&mut self, position: usize) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        let position = position.min(self.items.len());
        self.items.insert(
            position,
            MenuItem {
                id,
                label: String::new(),
                active: false,
            },
        );
        trace!("Inserted menu item {:?} at {}", id, position);
        id
    }

    fn remove_item(&mut self, item: ItemId) {
        self.items.retain(|existing| existing.id != item);
    }

    fn set_item_label(&mut self, item: ItemId, text: &str) {
        if let Some(existing) = self.item_mut(item) {
            existing.label = text.to_string();
        }
    }

    fn set_item_active(&mut self, item: ItemId, active: bool) {
        if let Some(existing) = self.item_mut(item) {
            existing.active = active;
        }
    }
}
