use std::collections::HashMap;

use marketplace_order::datastore::{
    AbsDStoreFilterKeyOp, AbstInMemoryDStore, AppInMemFetchKeys, AppInMemUpdateData,
};
use marketplace_order::error::AppErrorCode;

use crate::ut_inmem_dstore;

const UT_TABLE_LABEL_A: &str = "ut-cart";
const UT_TABLE_LABEL_B: &str = "ut-order";

// columns of each row are comma-separated
fn ut_rows(data: &[(&str, &str)]) -> HashMap<String, Vec<String>> {
    data.iter()
        .map(|(k, row)| (k.to_string(), row.split(',').map(String::from).collect()))
        .collect()
}

struct PrefixFilter(&'static str);

impl AbsDStoreFilterKeyOp for PrefixFilter {
    fn filter(&self, k: &String, _v: &Vec<String>) -> bool {
        k.starts_with(self.0)
    }
}

#[tokio::test]
async fn save_fetch_delete_ok() {
    let dstore = ut_inmem_dstore(10);
    for label in [UT_TABLE_LABEL_A, UT_TABLE_LABEL_B] {
        assert!(dstore.create_table(label).await.is_ok());
    }
    let data: AppInMemUpdateData = HashMap::from([
        (UT_TABLE_LABEL_A.to_string(), ut_rows(&[
            ("126-901", "a1,3"), ("126-902", "a2,1"), ("127-901", "a3,8"),
        ])),
        (UT_TABLE_LABEL_B.to_string(), ut_rows(&[("BL00AB12CD", "o1")])),
    ]);
    let result = dstore.save(data).await;
    assert_eq!(result.unwrap(), 4);

    let keys: AppInMemFetchKeys = HashMap::from([(
        UT_TABLE_LABEL_A.to_string(),
        vec!["126-902".to_string(), "nonexist".to_string()],
    )]);
    let fetched = dstore.fetch(keys).await.unwrap();
    let table = fetched.get(UT_TABLE_LABEL_A).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.get("126-902").unwrap(), &vec!["a2".to_string(), "1".to_string()]);

    let mut found = dstore
        .filter_keys(UT_TABLE_LABEL_A.to_string(), &PrefixFilter("126-"))
        .await
        .unwrap();
    found.sort();
    assert_eq!(found, vec!["126-901".to_string(), "126-902".to_string()]);

    let info = HashMap::from([(
        UT_TABLE_LABEL_A.to_string(),
        vec!["126-901".to_string(), "nonexist".to_string()],
    )]);
    assert_eq!(dstore.delete(info).await.unwrap(), 1);
    let found = dstore
        .filter_keys(UT_TABLE_LABEL_A.to_string(), &PrefixFilter("126-"))
        .await
        .unwrap();
    assert_eq!(found, vec!["126-902".to_string()]);
}

#[tokio::test]
async fn table_not_exist() {
    let dstore = ut_inmem_dstore(10);
    let data: AppInMemUpdateData =
        HashMap::from([(UT_TABLE_LABEL_A.to_string(), ut_rows(&[("k1", "v")]))]);
    let result = dstore.save(data).await;
    assert!(result.is_err());
    assert_eq!(result.unwrap_err().code, AppErrorCode::DataTableNotExist);
    let result = dstore
        .filter_keys(UT_TABLE_LABEL_B.to_string(), &PrefixFilter(""))
        .await;
    assert_eq!(result.unwrap_err().code, AppErrorCode::DataTableNotExist);
}

#[tokio::test]
async fn exceed_max_items() {
    let dstore = ut_inmem_dstore(3);
    dstore.create_table(UT_TABLE_LABEL_A).await.unwrap();
    let data = HashMap::from([(
        UT_TABLE_LABEL_A.to_string(),
        ut_rows(&[("k1", "v"), ("k2", "v")]),
    )]);
    assert_eq!(dstore.save(data).await.unwrap(), 2);
    // overwriting existing rows does not consume capacity
    let data = HashMap::from([(
        UT_TABLE_LABEL_A.to_string(),
        ut_rows(&[("k1", "v2"), ("k3", "v")]),
    )]);
    assert_eq!(dstore.save(data).await.unwrap(), 2);
    let data = HashMap::from([(UT_TABLE_LABEL_A.to_string(), ut_rows(&[("k4", "v")]))]);
    let result = dstore.save(data).await;
    assert_eq!(result.unwrap_err().code, AppErrorCode::ExceedingMaxLimit);
    let keys = HashMap::from([(UT_TABLE_LABEL_A.to_string(), vec!["k4".to_string()])]);
    let fetched = dstore.fetch(keys).await.unwrap();
    assert!(fetched.get(UT_TABLE_LABEL_A).unwrap().is_empty());
}

#[tokio::test]
async fn acquire_then_release() {
    let dstore = ut_inmem_dstore(10);
    dstore.create_table(UT_TABLE_LABEL_A).await.unwrap();
    let keys = HashMap::from([(UT_TABLE_LABEL_A.to_string(), vec!["k1".to_string()])]);
    let (fetched, lock) = dstore.fetch_acquire(keys).await.unwrap();
    assert!(fetched.get(UT_TABLE_LABEL_A).unwrap().is_empty());
    let more = lock
        .filter_keys(UT_TABLE_LABEL_A, &PrefixFilter("k"))
        .unwrap();
    assert!(more.is_empty());
    let data = HashMap::from([(UT_TABLE_LABEL_A.to_string(), ut_rows(&[("k1", "v")]))]);
    assert_eq!(dstore.save_release(data, lock).unwrap(), 1);
    // lock has been released, other callers proceed
    let keys = HashMap::from([(UT_TABLE_LABEL_A.to_string(), vec!["k1".to_string()])]);
    let fetched = dstore.fetch(keys).await.unwrap();
    assert_eq!(fetched.get(UT_TABLE_LABEL_A).unwrap().len(), 1);
}
