//! Macros for defining entity schemas.
//!
//! The [`define_entity!`] macro generates name constants for a bilingual
//! entity: the primary table, its `_lang` companion and the columns of each.

/// Defines a module with column name constants for a bilingual entity.
///
/// # Syntax
///
/// ```ignore
/// define_entity!(
///     pages {
///         table: "pages",
///         columns: {
///             ALIAS => "alias",
///             VIEWS => "views"
///         },
///         lang_columns: {
///             TITLE => "title"
///         }
///     }
/// );
/// ```
///
/// This expands to:
///
/// ```ignore
/// pub mod pages {
///     pub const TABLE: &str = "pages";
///     pub const LANG_TABLE: &str = "pages_lang";
///     pub const ALIAS: &str = "alias";
///     pub const VIEWS: &str = "views";
///     pub const TITLE: &str = "title";
///     pub const COLUMNS: &[&str] = &["alias", "views"];
///     pub const LANG_COLUMNS: &[&str] = &["title"];
/// }
/// ```
#[macro_export]
macro_rules! define_entity {
    (
        $entity:ident {
            table: $table:literal,
            columns: {
                $($col_name:ident => $db_col:literal),* $(,)?
            },
            lang_columns: {
                $($lang_name:ident => $lang_col:literal),* $(,)?
            } $(,)?
        }
    ) => {
        pub mod $entity {
            pub const TABLE: &str = $table;
            pub const LANG_TABLE: &str = concat!($table, "_lang");

            $(
                pub const $col_name: &str = $db_col;
            )*

            $(
                pub const $lang_name: &str = $lang_col;
            )*

            pub const COLUMNS: &[&str] = &[$($db_col),*];
            pub const LANG_COLUMNS: &[&str] = &[$($lang_col),*];
        }
    };
}
