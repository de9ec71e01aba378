use super::fields::{FilterField, PickerItem};

/// Popup list for choosing one value of a filter field. Typing narrows the
/// list to labels containing the query (case-insensitive).
pub(crate) struct Picker {
    pub(crate) field: FilterField,
    items: Vec<PickerItem>,
    visible: Vec<usize>,
    pub(crate) query: String,
    pub(crate) selected: usize,
}

impl Picker {
    pub(crate) fn new(field: FilterField, items: Vec<PickerItem>, current: &str) -> Self {
        let mut picker = Self {
            field,
            visible: (0..items.len()).collect(),
            items,
            query: String::new(),
            selected: 0,
        };
        // Start on the entry matching the sidebar value; index 0 is the unset choice.
        if let Some(position) = picker
            .items
            .iter()
            .skip(1)
            .position(|item| item.label == current)
        {
            picker.selected = position + 1;
        }
        picker
    }

    pub(crate) fn visible_items(&self) -> impl Iterator<Item = &PickerItem> {
        self.visible.iter().filter_map(|&index| self.items.get(index))
    }

    pub(crate) fn len(&self) -> usize {
        self.visible.len()
    }

    pub(crate) fn current(&self) -> Option<&PickerItem> {
        self.visible
            .get(self.selected)
            .and_then(|&index| self.items.get(index))
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.visible.is_empty() {
            return;
        }
        let last = self.visible.len() as isize - 1;
        self.selected = (self.selected as isize + offset).clamp(0, last) as usize;
    }

    pub(crate) fn push_char(&mut self, ch: char) {
        self.query.push(ch);
        self.narrow();
    }

    pub(crate) fn pop_char(&mut self) {
        if self.query.pop().is_some() {
            self.narrow();
        }
    }

    fn narrow(&mut self) {
        let needle = self.query.to_lowercase();
        self.visible = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| needle.is_empty() || item.label.to_lowercase().contains(&needle))
            .map(|(index, _)| index)
            .collect();
        self.selected = 0;
    }
}
