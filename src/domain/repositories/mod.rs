pub mod project_source;

pub use project_source::{
    fetch_all_items, FieldDef, ItemPage, ProjectRef, ProjectSource, SelectOption,
    MAX_ITEMS_PER_PROJECT, PAGE_SIZE,
};

#[cfg(test)]
pub use project_source::MockProjectSource;
