//! DynamoStore: the managed table, always addressed in the home region.

use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

use super::{item_key, ScanFilter, SnapshotStore, StoreError};
use crate::aws::AwsContext;
use crate::item::{AttrValue, Item};
use crate::record::ATTR_SNAPSHOT_ID;

type DdbItem = HashMap<String, AttributeValue>;

pub struct DynamoStore {
    aws: Arc<AwsContext>,
    client: Client,
    table: String,
}

impl DynamoStore {
    pub fn new(aws: Arc<AwsContext>, home_region: &str, table: impl Into<String>) -> Self {
        let client = Client::new(&aws.sdk_config(home_region));
        Self {
            aws,
            client,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl SnapshotStore for DynamoStore {
    fn put_if_absent(&self, item: &Item) -> Result<(), StoreError> {
        let key = item_key(item)?.to_string();
        let res = self.aws.block_on(
            self.client
                .put_item()
                .table_name(&self.table)
                .set_item(Some(to_ddb_item(item)))
                .condition_expression("attribute_not_exists(#pk)")
                .expression_attribute_names("#pk", ATTR_SNAPSHOT_ID)
                .send(),
        );

        res.map(|_| ()).map_err(|e| {
            put_error(&key, &self.table, e.as_service_error(), &DisplayErrorContext(&e).to_string())
        })
    }

    fn scan(&self, filter: Option<&ScanFilter>) -> Result<Vec<Item>, StoreError> {
        let mut items = Vec::new();
        let mut start_key: Option<DdbItem> = None;
        let mut pages = 0u32;

        loop {
            let mut req = self
                .client
                .scan()
                .table_name(&self.table)
                .set_exclusive_start_key(start_key.take());
            if let Some(f) = filter {
                req = req
                    .filter_expression("#f = :v")
                    .expression_attribute_names("#f", f.attribute.as_str())
                    .expression_attribute_values(":v", to_ddb(&f.equals));
            }

            let out = self.aws.block_on(req.send()).map_err(|e| {
                StoreError::Backend(format!("Scan {}: {}", self.table, DisplayErrorContext(&e)))
            })?;
            pages += 1;

            items.extend(out.items().iter().map(from_ddb_item));

            match out.last_evaluated_key() {
                Some(k) if !k.is_empty() => start_key = Some(k.clone()),
                _ => break,
            }
        }

        debug!("dynamo: scanned {} item(s) in {} page(s)", items.len(), pages);
        Ok(items)
    }
}

/// A failed conditional check means the key is taken; anything else is a
/// backend failure.
fn put_error(key: &str, table: &str, service: Option<&PutItemError>, detail: &str) -> StoreError {
    match service {
        Some(se) if se.is_conditional_check_failed_exception() => {
            StoreError::AlreadyExists(key.to_string())
        }
        _ => StoreError::Backend(format!("PutItem {}: {}", table, detail)),
    }
}

fn to_ddb_item(item: &Item) -> DdbItem {
    item.iter().map(|(k, v)| (k.clone(), to_ddb(v))).collect()
}

fn to_ddb(v: &AttrValue) -> AttributeValue {
    match v {
        AttrValue::S(s) => AttributeValue::S(s.clone()),
        AttrValue::N(n) => AttributeValue::N(n.clone()),
        AttrValue::Bool(b) => AttributeValue::Bool(*b),
        AttrValue::Null(b) => AttributeValue::Null(*b),
        AttrValue::L(l) => AttributeValue::L(l.iter().map(to_ddb).collect()),
        AttrValue::M(m) => AttributeValue::M(m.iter().map(|(k, v)| (k.clone(), to_ddb(v))).collect()),
    }
}

fn from_ddb_item(item: &DdbItem) -> Item {
    item.iter().map(|(k, v)| (k.clone(), from_ddb(v))).collect()
}

fn from_ddb(v: &AttributeValue) -> AttrValue {
    match v {
        AttributeValue::S(s) => AttrValue::S(s.clone()),
        AttributeValue::N(n) => AttrValue::N(n.clone()),
        AttributeValue::Bool(b) => AttrValue::Bool(*b),
        AttributeValue::Null(b) => AttrValue::Null(*b),
        AttributeValue::L(l) => AttrValue::L(l.iter().map(from_ddb).collect()),
        AttributeValue::M(m) => AttrValue::M(m.iter().map(|(k, v)| (k.clone(), from_ddb(v))).collect()),
        AttributeValue::Ss(ss) => AttrValue::L(ss.iter().cloned().map(AttrValue::S).collect()),
        AttributeValue::Ns(ns) => AttrValue::L(ns.iter().cloned().map(AttrValue::N).collect()),
        // binary and future variants have no JSON meaning here
        _ => AttrValue::Null(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::types::error::{ConditionalCheckFailedException, ResourceNotFoundException};

    #[test]
    fn attribute_values_convert_both_ways() {
        let mut item = Item::new();
        item.insert("snapshotId".into(), AttrValue::S("snap-9".into()));
        item.insert("volumeSize".into(), AttrValue::number(250));
        item.insert("encrypted".into(), AttrValue::Bool(true));
        item.insert("extra".into(), AttrValue::L(vec![AttrValue::Null(true)]));

        let ddb = to_ddb_item(&item);
        assert_eq!(ddb.get("volumeSize"), Some(&AttributeValue::N("250".into())));
        assert_eq!(from_ddb_item(&ddb), item);
    }

    #[test]
    fn conditional_check_failure_is_a_duplicate() {
        let se = PutItemError::ConditionalCheckFailedException(
            ConditionalCheckFailedException::builder()
                .message("The conditional request failed")
                .build(),
        );
        let err = put_error("snap-9", "PublicSnapshots", Some(&se), "ConditionalCheckFailedException");
        assert!(err.is_duplicate());
        assert!(matches!(err, StoreError::AlreadyExists(ref k) if k == "snap-9"));
    }

    #[test]
    fn other_put_failures_are_backend_errors() {
        let se = PutItemError::ResourceNotFoundException(
            ResourceNotFoundException::builder().message("no table").build(),
        );
        let err = put_error("snap-9", "PublicSnapshots", Some(&se), "ResourceNotFoundException: no table");
        assert!(!err.is_duplicate());
        assert!(matches!(err, StoreError::Backend(ref m) if m.contains("PublicSnapshots")));

        // dispatch/timeout errors carry no service error at all
        let err = put_error("snap-9", "PublicSnapshots", None, "dispatch failure");
        assert!(matches!(err, StoreError::Backend(ref m) if m.contains("dispatch failure")));
    }

    #[test]
    fn string_sets_become_lists() {
        let v = AttributeValue::Ss(vec!["a".into(), "b".into()]);
        assert_eq!(
            from_ddb(&v),
            AttrValue::L(vec![AttrValue::S("a".into()), AttrValue::S("b".into())])
        );
    }
}
