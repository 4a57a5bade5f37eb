use std::borrow::Cow;
use std::collections::HashMap;

use itertools::Itertools;

/// Query parameter addressing a catalog object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum CatalogParameter {
    Workspace,
    DataItem,
    Schema,
    Table,
}

impl CatalogParameter {
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required query parameter(s): {}", .0.iter().join(", "))]
    MissingParameters(Vec<CatalogParameter>),
}

/// Catalog operations exposed by the proxy. Each maps one route to one
/// upstream path template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum CatalogEndpoint {
    GetConfiguration,
    ListNamespaces,
    GetSchemaDetails,
    ListTables,
    GetTableDetails,
}

impl CatalogEndpoint {
    /// Route name under which the endpoint is served.
    #[must_use]
    pub fn route(self) -> &'static str {
        match self {
            CatalogEndpoint::GetConfiguration => "fn_get_irc_configuration",
            CatalogEndpoint::ListNamespaces => "fn_list_namespaces",
            CatalogEndpoint::GetSchemaDetails => "fn_get_schema_details",
            CatalogEndpoint::ListTables => "fn_read_iceberg_catalog",
            CatalogEndpoint::GetTableDetails => "fn_read_tables",
        }
    }

    #[must_use]
    pub fn required_parameters(self) -> &'static [CatalogParameter] {
        use CatalogParameter::{DataItem, Schema, Table, Workspace};

        match self {
            CatalogEndpoint::GetConfiguration | CatalogEndpoint::ListNamespaces => {
                &[Workspace, DataItem]
            }
            CatalogEndpoint::GetSchemaDetails | CatalogEndpoint::ListTables => {
                &[Workspace, DataItem, Schema]
            }
            CatalogEndpoint::GetTableDetails => &[Workspace, DataItem, Schema, Table],
        }
    }

    /// Upstream path, may contain `{warehouse}`, `{schema}` and `{table}`
    /// placeholders.
    #[must_use]
    pub fn path_template(self) -> &'static str {
        match self {
            CatalogEndpoint::GetConfiguration => "/iceberg/v1/config?warehouse={warehouse}",
            CatalogEndpoint::ListNamespaces => "/iceberg/v1/{warehouse}/namespaces",
            CatalogEndpoint::GetSchemaDetails => "/iceberg/v1/{warehouse}/namespaces/{schema}",
            CatalogEndpoint::ListTables => "/iceberg/v1/{warehouse}/namespaces/{schema}/tables",
            CatalogEndpoint::GetTableDetails => {
                "/iceberg/v1/{warehouse}/namespaces/{schema}/tables/{table}"
            }
        }
    }

    #[must_use]
    pub fn upstream_path(self, path: &CatalogPath) -> String {
        render_template(self.path_template(), |placeholder| path.segment(placeholder))
    }
}

/// Location of a catalog object taken from the query string.
/// Values are used verbatim, including empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPath {
    pub workspace: String,
    pub data_item: String,
    pub schema: Option<String>,
    pub table: Option<String>,
}

impl CatalogPath {
    #[must_use]
    pub fn new(workspace: impl Into<String>, data_item: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            data_item: data_item.into(),
            schema: None,
            table: None,
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Extract the parameters `endpoint` requires. Parameters the endpoint
    /// does not use are ignored.
    ///
    /// # Errors
    /// Fails with all missing parameters if any required parameter is absent.
    pub fn from_query(
        endpoint: CatalogEndpoint,
        query: &HashMap<String, String>,
    ) -> Result<Self, ValidationError> {
        let required = endpoint.required_parameters();
        let missing = required
            .iter()
            .copied()
            .filter(|p| !query.contains_key(p.name()))
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(ValidationError::MissingParameters(missing));
        }

        let take = |parameter: CatalogParameter| {
            required
                .contains(&parameter)
                .then(|| query.get(parameter.name()).cloned())
                .flatten()
        };

        Ok(Self {
            workspace: take(CatalogParameter::Workspace).unwrap_or_default(),
            data_item: take(CatalogParameter::DataItem).unwrap_or_default(),
            schema: take(CatalogParameter::Schema),
            table: take(CatalogParameter::Table),
        })
    }

    /// Warehouse identifier as understood by OneLake: `/{workspace}/{dataitem}`.
    #[must_use]
    pub fn warehouse_id(&self) -> String {
        format!("/{}/{}", self.workspace, self.data_item)
    }

    fn segment(&self, placeholder: &str) -> Option<Cow<'_, str>> {
        match placeholder {
            "warehouse" => Some(Cow::Owned(self.warehouse_id())),
            "schema" => self.schema.as_deref().map(Cow::Borrowed),
            "table" => self.table.as_deref().map(Cow::Borrowed),
            _ => None,
        }
    }
}

/// Substitute `{name}` placeholders in a single pass. Substituted values are
/// never scanned again; unknown placeholders are kept as they are.
fn render_template<'a>(
    template: &str,
    lookup: impl Fn(&str) -> Option<Cow<'a, str>>,
) -> String {
    let mut rendered = String::with_capacity(template.len() + 64);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let placeholder = &rest[start + 1..start + len];
        rendered.push_str(&rest[..start]);
        match lookup(placeholder) {
            Some(value) => rendered.push_str(&value),
            None => rendered.push_str(&rest[start..=start + len]),
        }
        rest = &rest[start + len + 1..];
    }

    rendered.push_str(rest);
    rendered
}
