use binprov_core::BinProvider;
use tabled::{
    Table, Tabled,
    settings::{Panel, Remove, Style, object::Rows},
};

#[derive(Debug, Clone, Default)]
pub struct Formatter {
    pub header: Option<String>,
    /// Drop the column-name row.
    pub no_col_name: bool,
}

impl Formatter {
    pub fn build<T: Tabled, I: IntoIterator<Item = T>>(self, data: I) -> Table {
        let mut table = Table::new(data);
        if self.no_col_name {
            table.with(Remove::row(Rows::first()));
        }
        if let Some(header) = self.header {
            table.with(Panel::header(header));
        }

        table.with(Style::blank());
        table
    }
}

#[derive(Debug, Clone, Tabled)]
pub struct ProviderRow {
    #[tabled(rename = "PROVIDER")]
    pub name: String,
    #[tabled(rename = "INSTALLER")]
    pub installer: String,
    #[tabled(rename = "VALID")]
    pub valid: bool,
    #[tabled(rename = "SEARCH PATH")]
    pub search_path: String,
}

impl From<&BinProvider> for ProviderRow {
    fn from(provider: &BinProvider) -> Self {
        let installer = match provider.installer_abspath() {
            Some(path) => path.display().to_string(),
            None => format!("{} (missing)", provider.installer()),
        };
        Self {
            name: provider.name().to_string(),
            installer,
            valid: provider.is_valid(),
            search_path: provider.search_path().to_string(),
        }
    }
}

/// One provider's answer about one binary.
#[derive(Debug, Clone, Tabled)]
pub struct AnswerRow {
    #[tabled(rename = "PROVIDER")]
    pub provider: String,
    #[tabled(rename = "RESULT")]
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<AnswerRow> {
        vec![
            AnswerRow {
                provider: String::from("env"),
                value: String::from("/usr/bin/node"),
            },
            AnswerRow {
                provider: String::from("npm"),
                value: String::from("-"),
            },
        ]
    }

    #[test]
    fn test_table_has_column_names() {
        let out = Formatter::default().build(rows()).to_string();
        assert!(out.lines().next().unwrap().contains("PROVIDER"));
        assert!(out.lines().last().unwrap().contains("npm"));
    }

    #[test]
    fn test_table_without_column_names() {
        let formatter = Formatter {
            header: Some(String::from("node")),
            no_col_name: true,
        };
        let out = formatter.build(rows()).to_string();
        assert!(!out.contains("PROVIDER"));
        assert!(out.lines().next().unwrap().contains("node"));
    }
}
