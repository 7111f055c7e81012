//! Fluent URI builder for OData queries
//!
//! Collects the structured query options, then renders them in a fixed
//! order so the resulting query string is deterministic: `$select`, `$top`,
//! `$skip`, `$count`, `$filter`, `$expand`, `$orderby`.

use crate::error::Result;

use super::super::filter::Filter;
use super::super::value::ODataValue;
use super::orderby::OrderBy;

/// One `$expand` entry: a bare navigation-property name, or a name with an
/// embedded `$filter` applied to the expanded rows
#[derive(Debug, Clone)]
pub enum Expand {
    Name(String),
    Filtered(String, Vec<Filter>),
}

impl Expand {
    pub fn name(name: impl Into<String>) -> Self {
        Expand::Name(name.into())
    }

    pub fn filtered(name: impl Into<String>, filters: Vec<Filter>) -> Self {
        Expand::Filtered(name.into(), filters)
    }

    /// Render as `name` or `name($filter=...)`; a filtered entry with an
    /// empty filter list collapses to the bare name.
    fn render(&self) -> Result<String> {
        match self {
            Expand::Name(name) => Ok(name.clone()),
            Expand::Filtered(name, filters) if filters.is_empty() => Ok(name.clone()),
            Expand::Filtered(name, filters) => {
                let rendered: Result<Vec<String>> =
                    filters.iter().map(|f| f.render()).collect();
                Ok(format!("{}($filter={})", name, Filter::and_join(&rendered?)))
            }
        }
    }
}

/// Builder for one resource-relative query URI, finalized by [`Self::build`]
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    resource: String,
    key: Option<ODataValue>,
    select: Vec<String>,
    raw_select: Option<String>,
    expand: Vec<Expand>,
    top: Option<u32>,
    skip: Option<u32>,
    count: bool,
    filters: Vec<Filter>,
    raw_filter: Option<String>,
    order: Vec<OrderBy>,
}

impl QueryBuilder {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Default::default()
        }
    }

    /// Key predicate, appended to the resource path as `(<literal>)`.
    pub fn key(mut self, key: impl Into<ODataValue>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Pass a pre-built `$select` string through unmodified.
    pub fn select_raw(mut self, select: impl Into<String>) -> Self {
        self.raw_select = Some(select.into());
        self
    }

    pub fn expand(mut self, expand: Expand) -> Self {
        self.expand.push(expand);
        self
    }

    pub fn expand_all<I>(mut self, expands: I) -> Self
    where
        I: IntoIterator<Item = Expand>,
    {
        self.expand.extend(expands);
        self
    }

    pub fn top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn count(mut self, count: bool) -> Self {
        self.count = count;
        self
    }

    /// Add one filter term; all terms are AND-joined into `$filter`.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filter_all<I>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = Filter>,
    {
        self.filters.extend(filters);
        self
    }

    /// Set a raw `$filter` fragment, AND-joined with any structured terms.
    pub fn filter_raw(mut self, filter: impl Into<String>) -> Self {
        self.raw_filter = Some(filter.into());
        self
    }

    pub fn order_by(mut self, order: impl Into<OrderBy>) -> Self {
        self.order.push(order.into());
        self
    }

    pub fn order_by_all<I, O>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<OrderBy>,
    {
        self.order.extend(order.into_iter().map(Into::into));
        self
    }

    /// Finalize into the resource-relative URI string. Empty options are
    /// omitted entirely.
    pub fn build(self) -> Result<String> {
        let mut uri = self.resource.clone();
        if let Some(key) = &self.key {
            uri.push_str(&format!("({})", key.encode()));
        }

        let mut options: Vec<String> = Vec::new();

        let select = match &self.raw_select {
            Some(raw) => raw.clone(),
            None => self.select.join(","),
        };
        if !select.is_empty() {
            options.push(format!("$select={select}"));
        }

        if let Some(top) = self.top {
            options.push(format!("$top={top}"));
        }
        if let Some(skip) = self.skip {
            options.push(format!("$skip={skip}"));
        }
        if self.count {
            options.push("$count=true".to_string());
        }

        let mut filter_parts: Vec<String> = Vec::new();
        for filter in &self.filters {
            filter_parts.push(filter.render()?);
        }
        if let Some(raw) = &self.raw_filter
            && !raw.is_empty()
        {
            filter_parts.push(raw.clone());
        }
        if !filter_parts.is_empty() {
            options.push(format!("$filter={}", Filter::and_join(&filter_parts)));
        }

        if !self.expand.is_empty() {
            let rendered: Result<Vec<String>> =
                self.expand.iter().map(|e| e.render()).collect();
            options.push(format!("$expand={}", rendered?.join(",")));
        }

        if !self.order.is_empty() {
            let rendered: Vec<String> = self.order.iter().map(|o| o.render()).collect();
            options.push(format!("$orderby={}", rendered.join(",")));
        }

        if !options.is_empty() {
            uri.push('?');
            uri.push_str(&options.join("&"));
        }
        Ok(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::filter::CompareOp;

    #[test]
    fn test_bare_resource() {
        assert_eq!(QueryBuilder::new("customers").build().unwrap(), "customers");
    }

    #[test]
    fn test_guid_key_predicate_unquoted() {
        let uri = QueryBuilder::new("customers")
            .key("f3c1c612-fc83-f011-a6f5-000d3a4b6d9d")
            .build()
            .unwrap();
        assert_eq!(uri, "customers(f3c1c612-fc83-f011-a6f5-000d3a4b6d9d)");
    }

    #[test]
    fn test_string_key_predicate_quoted() {
        let uri = QueryBuilder::new("companies")
            .key("CRONUS")
            .build()
            .unwrap();
        assert_eq!(uri, "companies('CRONUS')");
    }

    #[test]
    fn test_option_order_is_fixed() {
        let uri = QueryBuilder::new("salesOrders")
            .order_by(OrderBy::desc("orderDate"))
            .expand(Expand::name("salesOrderLines"))
            .filter(Filter::eq("status", "Open"))
            .count(true)
            .skip(40)
            .top(20)
            .select(["number", "status"])
            .build()
            .unwrap();
        assert_eq!(
            uri,
            "salesOrders?$select=number,status&$top=20&$skip=40&$count=true\
             &$filter=status eq 'Open'&$expand=salesOrderLines&$orderby=orderDate desc"
        );
    }

    #[test]
    fn test_expand_with_embedded_filter() {
        let uri = QueryBuilder::new("customers")
            .expand(Expand::filtered(
                "shipToAddresses",
                vec![Filter::eq("city", "Atlanta")],
            ))
            .build()
            .unwrap();
        assert_eq!(
            uri,
            "customers?$expand=shipToAddresses($filter=city eq 'Atlanta')"
        );
    }

    #[test]
    fn test_expand_with_empty_filter_list_collapses() {
        let uri = QueryBuilder::new("customers")
            .expand(Expand::filtered("shipToAddresses", Vec::new()))
            .build()
            .unwrap();
        assert_eq!(uri, "customers?$expand=shipToAddresses");
    }

    #[test]
    fn test_mixed_expand_entries() {
        let uri = QueryBuilder::new("customers")
            .expand(Expand::name("paymentTerm"))
            .expand(Expand::filtered(
                "shipToAddresses",
                vec![Filter::eq("city", "Atlanta")],
            ))
            .build()
            .unwrap();
        assert_eq!(
            uri,
            "customers?$expand=paymentTerm,shipToAddresses($filter=city eq 'Atlanta')"
        );
    }

    #[test]
    fn test_filters_and_join_with_raw_fragment() {
        let uri = QueryBuilder::new("items")
            .filter(Filter::eq("type", "Inventory"))
            .filter(Filter::new("unitPrice", CompareOp::Gt, 10.5))
            .filter_raw("blocked eq false")
            .build()
            .unwrap();
        assert_eq!(
            uri,
            "items?$filter=type eq 'Inventory' and unitPrice gt 10.5 and blocked eq false"
        );
    }

    #[test]
    fn test_raw_select_passthrough() {
        let uri = QueryBuilder::new("items")
            .select_raw("number,displayName")
            .build()
            .unwrap();
        assert_eq!(uri, "items?$select=number,displayName");
    }

    #[test]
    fn test_order_by_from_str() {
        let uri = QueryBuilder::new("items")
            .order_by_all(["displayName", "unitPrice desc"])
            .build()
            .unwrap();
        assert_eq!(uri, "items?$orderby=displayName asc,unitPrice desc");
    }

    #[test]
    fn test_filter_error_propagates() {
        let result = QueryBuilder::new("items")
            .filter(Filter::eq("status", Vec::<String>::new()))
            .build();
        assert!(result.is_err());
    }
}
