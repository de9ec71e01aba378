use crate::filter::{FilterConfig, FilterOptions, Selection};
use crate::models::Decade;

/// Rows of the filter sidebar, top to bottom.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum FilterField {
    QuickMagnums,
    FavoriteProducer,
    Producer,
    Vintage,
    Location,
    Varietal,
    Decade,
    Terroir,
    Fridge,
    Shelf,
}

impl FilterField {
    pub(crate) const ALL: [FilterField; 10] = [
        FilterField::QuickMagnums,
        FilterField::FavoriteProducer,
        FilterField::Producer,
        FilterField::Vintage,
        FilterField::Location,
        FilterField::Varietal,
        FilterField::Decade,
        FilterField::Terroir,
        FilterField::Fridge,
        FilterField::Shelf,
    ];

    pub(crate) fn label(&self, options: &FilterOptions) -> &'static str {
        match self {
            FilterField::QuickMagnums => "Magnums only",
            FilterField::FavoriteProducer => "Favorite producer",
            FilterField::Producer => "Producer",
            FilterField::Vintage => "Vintage",
            FilterField::Location => "Location",
            FilterField::Varietal => "Varietal",
            FilterField::Decade => "Decade",
            FilterField::Terroir if options.terroir_limited => "Terroir (limited)",
            FilterField::Terroir => "Terroir",
            FilterField::Fridge => "Fridge",
            FilterField::Shelf => "Shelf",
        }
    }

    /// Text shown for "no constraint" in this field.
    fn unset_label(&self) -> &'static str {
        match self {
            FilterField::FavoriteProducer => "None",
            _ => "All",
        }
    }

    /// Current value rendered for the sidebar.
    pub(crate) fn current(&self, filters: &FilterConfig) -> String {
        let unset = self.unset_label();
        match self {
            FilterField::QuickMagnums => {
                let label = if filters.quick_magnums { "On" } else { "Off" };
                label.to_string()
            }
            FilterField::FavoriteProducer => text_or(&filters.favorite_producer, unset),
            FilterField::Producer => text_or(&filters.producer, unset),
            FilterField::Vintage => display_or(&filters.vintage, unset),
            FilterField::Location => text_or(&filters.location, unset),
            FilterField::Varietal => text_or(&filters.varietal, unset),
            FilterField::Decade => display_or(&filters.decade, unset),
            FilterField::Terroir => text_or(&filters.terroir, unset),
            FilterField::Fridge => text_or(&filters.selected_fridge, unset),
            FilterField::Shelf => display_or(&filters.selected_shelf, unset),
        }
    }

    /// Picker entries: the unset choice first, then every available value.
    pub(crate) fn choices(&self, options: &FilterOptions, shelves: &[u32]) -> Vec<PickerItem> {
        let mut items = vec![PickerItem {
            label: self.unset_label().to_string(),
            choice: Choice::Clear,
        }];
        let values: Vec<PickerItem> = match self {
            FilterField::QuickMagnums => Vec::new(),
            FilterField::FavoriteProducer | FilterField::Producer => text_items(&options.producers),
            FilterField::Vintage => options
                .vintages
                .iter()
                .map(|year| PickerItem {
                    label: year.to_string(),
                    choice: Choice::Year(*year),
                })
                .collect(),
            FilterField::Location => text_items(&options.locations),
            FilterField::Varietal => text_items(&options.varietals),
            FilterField::Decade => options
                .decades
                .iter()
                .map(|decade| PickerItem {
                    label: decade.label(),
                    choice: Choice::Decade(*decade),
                })
                .collect(),
            FilterField::Terroir => text_items(&options.terroirs),
            FilterField::Fridge => text_items(&options.fridges),
            FilterField::Shelf => shelves
                .iter()
                .map(|shelf| PickerItem {
                    label: shelf.to_string(),
                    choice: Choice::Shelf(*shelf),
                })
                .collect(),
        };
        items.extend(values);
        items
    }

    /// New configuration with `choice` applied to this field. Choices of the
    /// wrong kind for the field leave the configuration unchanged.
    pub(crate) fn apply(&self, filters: &FilterConfig, choice: &Choice) -> FilterConfig {
        let mut next = filters.clone();
        match (self, choice) {
            (FilterField::QuickMagnums, _) => {}
            (FilterField::Fridge, Choice::Clear) => return next.with_fridge(Selection::Any),
            (FilterField::Fridge, Choice::Text(name)) => {
                return next.with_fridge(Selection::Only(name.clone()))
            }
            (field, Choice::Clear) => field.clear(&mut next),
            (FilterField::FavoriteProducer, Choice::Text(value)) => {
                next.favorite_producer = Selection::Only(value.clone())
            }
            (FilterField::Producer, Choice::Text(value)) => {
                next.producer = Selection::Only(value.clone())
            }
            (FilterField::Location, Choice::Text(value)) => {
                next.location = Selection::Only(value.clone())
            }
            (FilterField::Varietal, Choice::Text(value)) => {
                next.varietal = Selection::Only(value.clone())
            }
            (FilterField::Terroir, Choice::Text(value)) => {
                next.terroir = Selection::Only(value.clone())
            }
            (FilterField::Vintage, Choice::Year(year)) => next.vintage = Selection::Only(*year),
            (FilterField::Decade, Choice::Decade(decade)) => {
                next.decade = Selection::Only(*decade)
            }
            (FilterField::Shelf, Choice::Shelf(shelf)) => {
                next.selected_shelf = Selection::Only(*shelf)
            }
            _ => {}
        }
        next
    }

    fn clear(&self, filters: &mut FilterConfig) {
        match self {
            FilterField::QuickMagnums => filters.quick_magnums = false,
            FilterField::FavoriteProducer => filters.favorite_producer = Selection::Any,
            FilterField::Producer => filters.producer = Selection::Any,
            FilterField::Vintage => filters.vintage = Selection::Any,
            FilterField::Location => filters.location = Selection::Any,
            FilterField::Varietal => filters.varietal = Selection::Any,
            FilterField::Decade => filters.decade = Selection::Any,
            FilterField::Terroir => filters.terroir = Selection::Any,
            FilterField::Fridge => filters.selected_fridge = Selection::Any,
            FilterField::Shelf => filters.selected_shelf = Selection::Any,
        }
    }
}

/// Value a picker entry assigns to its field.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Choice {
    Clear,
    Text(String),
    Year(i32),
    Decade(Decade),
    Shelf(u32),
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PickerItem {
    pub(crate) label: String,
    pub(crate) choice: Choice,
}

fn text_items(values: &[String]) -> Vec<PickerItem> {
    values
        .iter()
        .map(|value| PickerItem {
            label: value.clone(),
            choice: Choice::Text(value.clone()),
        })
        .collect()
}

fn text_or(selection: &Selection<String>, unset: &str) -> String {
    selection
        .value()
        .cloned()
        .unwrap_or_else(|| unset.to_string())
}

fn display_or<T: PartialEq + ToString>(selection: &Selection<T>, unset: &str) -> String {
    selection
        .value()
        .map(ToString::to_string)
        .unwrap_or_else(|| unset.to_string())
}
