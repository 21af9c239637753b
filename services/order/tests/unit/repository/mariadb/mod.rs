
use std::env;
use std::sync::Arc;

use marketplace_common::confidentiality::UserSpaceConfidentiality;
use marketplace_common::constant::env_vars::SYS_BASEPATH;
use marketplace_order::AppDataStoreContext;

use crate::ut_setup_share_state;

// the tables are never truncated between runs, each test works on random
// owner or product IDs so earlier rows do not interfere
fn ut_dstore_ctx() -> Arc<AppDataStoreContext> {
    let cfdntl = {
        let sys_basepath = env::var(SYS_BASEPATH).unwrap();
        let path = sys_basepath + "/common/data/secrets.json";
        UserSpaceConfidentiality::build(path)
    };
    let app_state = ut_setup_share_state("config_mariadb.json", Box::new(cfdntl)).unwrap();
    let dstore = app_state.datastore();
    assert!(dstore.in_mem.is_none());
    let db_stores = dstore.sql_dbs.as_ref().unwrap();
    assert!(!db_stores.is_empty());
    dstore
}

fn ut_random_owner() -> u32 {
    rand::random::<u32>() | 0x1000_0000
}
