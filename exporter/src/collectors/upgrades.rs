//! Pending-upgrade detection.
//!
//! Combines the plan reported by the upgrade manager with an optional
//! height-to-time estimate from the node RPC, then checks whether the
//! upgrade binary is already installed. Stages run in order:
//!
//! 1. fetch the plan (failure: nothing is emitted);
//! 2. `upgrade_coming`, stopping here when no upgrade is scheduled;
//! 3. `upgrade_info`;
//! 4. resolve the upgrade time, from the plan or by estimation (failure:
//!    keep what was built so far);
//! 5. `upgrade_estimated_time`;
//! 6. list installed binaries (failure: drop every sample of the cycle);
//! 7. `upgrade_binary_present`.
//!
//! Stage 6 is the only one whose failure discards earlier samples: the
//! binary-presence gauge is what operators alert on, and an upgrade time
//! exposed without it reads as "nothing to do".

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clients::{NodeRpc, UpgradeSource};
use crate::collectors::{CollectionResult, Collector, QueryLedger};
use crate::context::CollectContext;
use crate::types::{MetricName, MetricSample, UpgradePlan, bool_to_f64, normalize_upgrade_name};

pub const ACTION_GET_UPGRADE_PLAN: &str = "cosmovisor_get_upgrade_plan";
pub const ACTION_GET_UPGRADE_TIME: &str = "tendermint_get_upgrade_time";
pub const ACTION_GET_UPGRADES: &str = "cosmovisor_get_upgrades";

pub struct UpgradeCollector {
    name: &'static str,
    source: Option<Arc<dyn UpgradeSource>>,
    rpc: Option<Arc<dyn NodeRpc>>,
}

impl UpgradeCollector {
    /// `rpc` is only used to estimate the time of height-based upgrades and
    /// may be omitted.
    pub fn new(
        name: &'static str,
        source: Option<Arc<dyn UpgradeSource>>,
        rpc: Option<Arc<dyn NodeRpc>>,
    ) -> Self {
        Self { name, source, rpc }
    }

    /// Resolves when the upgrade will happen. `None` means the time could not
    /// be derived; the reason has already been logged (and recorded, when it
    /// was an RPC failure).
    fn resolve_time(
        &self,
        plan: &UpgradePlan,
        ctx: &CollectContext,
        ledger: &mut QueryLedger,
    ) -> Option<DateTime<Utc>> {
        if let Some(time) = plan.explicit_time() {
            return Some(time);
        }

        let Some(rpc) = &self.rpc else {
            tracing::warn!(
                collector = self.name,
                upgrade = %plan.name,
                "Tendermint RPC not configured and upgrade time not specified, not returning upgrade time"
            );
            return None;
        };

        let height = match plan.target_height.as_deref().map(str::parse::<i64>) {
            Some(Ok(height)) => height,
            Some(Err(e)) => {
                tracing::error!(
                    collector = self.name,
                    upgrade = %plan.name,
                    height = ?plan.target_height,
                    error = %e,
                    "could not convert expected upgrade height to an integer"
                );
                return None;
            }
            None => {
                tracing::error!(
                    collector = self.name,
                    upgrade = %plan.name,
                    "upgrade plan has neither a time nor a height"
                );
                return None;
            }
        };

        match ledger.record(
            ACTION_GET_UPGRADE_TIME,
            ctx.check()
                .and_then(|()| rpc.estimate_time_at_height(ctx, height)),
        ) {
            Ok(time) => Some(time),
            Err(e) => {
                tracing::error!(
                    collector = self.name,
                    upgrade = %plan.name,
                    height,
                    error = %e,
                    "could not get estimated upgrade time"
                );
                None
            }
        }
    }
}

impl Collector for UpgradeCollector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn enabled(&self) -> bool {
        self.source.is_some()
    }

    fn collect(&self, ctx: &CollectContext) -> CollectionResult {
        let Some(source) = &self.source else {
            return CollectionResult::default();
        };

        let mut ledger = QueryLedger::new();

        let plan = match ledger.record(
            ACTION_GET_UPGRADE_PLAN,
            ctx.check().and_then(|()| source.upgrade_plan()),
        ) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!(collector = self.name, error = %e, "could not get upgrade plan");
                return CollectionResult::new(Vec::new(), ledger);
            }
        };

        let mut samples = vec![MetricSample::unlabeled(
            MetricName::UpgradeComing,
            bool_to_f64(plan.is_pending()),
        )];

        if !plan.is_pending() {
            return CollectionResult::new(samples, ledger);
        }

        let labels = [("name", plan.name.as_str()), ("info", plan.info.as_str())];
        samples.push(MetricSample::new(MetricName::UpgradeInfo, labels, 1.0));

        let Some(upgrade_time) = self.resolve_time(&plan, ctx, &mut ledger) else {
            return CollectionResult::new(samples, ledger);
        };

        samples.push(MetricSample::new(
            MetricName::UpgradeEstimatedTime,
            labels,
            upgrade_time.timestamp() as f64,
        ));

        let upgrades = match ledger.record(
            ACTION_GET_UPGRADES,
            ctx.check().and_then(|()| source.upgrades()),
        ) {
            Ok(upgrades) => upgrades,
            Err(e) => {
                tracing::error!(collector = self.name, error = %e, "could not get installed upgrades");
                return CollectionResult::new(Vec::new(), ledger);
            }
        };

        let lookup_name = normalize_upgrade_name(&plan.name);
        tracing::debug!(
            collector = self.name,
            upgrade = %plan.name,
            lookup_name = %lookup_name,
            installed = upgrades.len(),
            "checking upgrade binary"
        );

        samples.push(MetricSample::new(
            MetricName::UpgradeBinaryPresent,
            labels,
            bool_to_f64(upgrades.has_upgrade(&lookup_name)),
        ));

        CollectionResult::new(samples, ledger)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use super::*;
    use crate::clients::ClientError;
    use crate::types::{NodeStatus, QueryRecord, UpgradeBinarySet};

    const UPGRADE_TS: i64 = 1_900_000_000;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).expect("valid timestamp")
    }

    struct DummySource {
        plan: Result<UpgradePlan, ()>,
        installed: Result<Vec<&'static str>, ()>,
        upgrades_calls: AtomicUsize,
    }

    impl UpgradeSource for DummySource {
        fn upgrade_plan(&self) -> Result<UpgradePlan, ClientError> {
            self.plan
                .clone()
                .map_err(|()| ClientError::Protocol("malformed upgrade plan output".to_string()))
        }

        fn upgrades(&self) -> Result<UpgradeBinarySet, ClientError> {
            self.upgrades_calls.fetch_add(1, Ordering::SeqCst);
            self.installed
                .clone()
                .map(|names| names.into_iter().collect())
                .map_err(|()| ClientError::Transport("upgrades dir unreadable".to_string()))
        }
    }

    struct DummyRpc {
        // if true, estimation succeeds with UPGRADE_TS; if false, it fails
        ok: bool,
        estimate_calls: AtomicUsize,
        last_height: AtomicUsize,
    }

    impl NodeRpc for DummyRpc {
        fn status(&self, _ctx: &CollectContext) -> Result<NodeStatus, ClientError> {
            unreachable!("upgrade collector never fetches node status")
        }

        fn estimate_time_at_height(
            &self,
            _ctx: &CollectContext,
            height: i64,
        ) -> Result<DateTime<Utc>, ClientError> {
            self.estimate_calls.fetch_add(1, Ordering::SeqCst);
            self.last_height.store(height as usize, Ordering::SeqCst);
            if self.ok {
                Ok(ts(UPGRADE_TS))
            } else {
                Err(ClientError::Status {
                    url: "http://node/block?height=1".to_string(),
                    status: 500,
                })
            }
        }
    }

    fn source(
        plan: Result<UpgradePlan, ()>,
        installed: Result<Vec<&'static str>, ()>,
    ) -> Arc<DummySource> {
        Arc::new(DummySource {
            plan,
            installed,
            upgrades_calls: AtomicUsize::new(0),
        })
    }

    fn rpc(ok: bool) -> Arc<DummyRpc> {
        Arc::new(DummyRpc {
            ok,
            estimate_calls: AtomicUsize::new(0),
            last_height: AtomicUsize::new(0),
        })
    }

    fn height_plan(name: &str, height: &str) -> UpgradePlan {
        UpgradePlan {
            name: name.to_string(),
            info: "https://example.com/upgrade.json".to_string(),
            target_height: Some(height.to_string()),
            target_time: Some(ts(-62_135_596_800)),
        }
    }

    fn timed_plan(name: &str) -> UpgradePlan {
        UpgradePlan {
            name: name.to_string(),
            info: "scheduled by governance".to_string(),
            target_height: None,
            target_time: Some(ts(UPGRADE_TS)),
        }
    }

    fn collector(source: Arc<DummySource>, rpc: Option<Arc<DummyRpc>>) -> UpgradeCollector {
        UpgradeCollector::new(
            "upgrades-querier",
            Some(source),
            rpc.map(|r| r as Arc<dyn NodeRpc>),
        )
    }

    fn names(result: &CollectionResult) -> Vec<MetricName> {
        result.samples.iter().map(|s| s.name()).collect()
    }

    fn collect(c: &UpgradeCollector) -> CollectionResult {
        c.collect(&CollectContext::background())
    }

    #[test]
    fn disabled_without_source() {
        let c = UpgradeCollector::new("upgrades-querier", None, Some(rpc(true)));
        assert!(!c.enabled());
        assert!(collect(&c).is_empty());
    }

    #[test]
    fn plan_failure_yields_only_failed_record() {
        let c = collector(source(Err(()), Ok(vec![])), Some(rpc(true)));
        let result = collect(&c);

        assert!(result.samples.is_empty());
        assert_eq!(
            result.queries,
            vec![QueryRecord::failure(ACTION_GET_UPGRADE_PLAN)]
        );
    }

    #[test]
    fn no_pending_upgrade_emits_single_zero_gauge() {
        let src = source(Ok(UpgradePlan::default()), Ok(vec![]));
        let r = rpc(true);
        let result = collect(&collector(src.clone(), Some(r.clone())));

        assert_eq!(names(&result), vec![MetricName::UpgradeComing]);
        assert_eq!(result.samples[0].value(), 0.0);
        assert_eq!(
            result.queries,
            vec![QueryRecord::success(ACTION_GET_UPGRADE_PLAN)]
        );
        assert_eq!(src.upgrades_calls.load(Ordering::SeqCst), 0);
        assert_eq!(r.estimate_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn explicit_time_skips_estimation() {
        let src = source(Ok(timed_plan("MyUpgrade v2")), Ok(vec!["myupgrade+v2"]));
        let r = rpc(true);
        let result = collect(&collector(src, Some(r.clone())));

        assert_eq!(
            names(&result),
            vec![
                MetricName::UpgradeComing,
                MetricName::UpgradeInfo,
                MetricName::UpgradeEstimatedTime,
                MetricName::UpgradeBinaryPresent,
            ]
        );
        assert_eq!(r.estimate_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            result.queries,
            vec![
                QueryRecord::success(ACTION_GET_UPGRADE_PLAN),
                QueryRecord::success(ACTION_GET_UPGRADES),
            ]
        );
        assert_eq!(result.samples[2].value(), UPGRADE_TS as f64);
    }

    #[test]
    fn binary_lookup_uses_normalized_name_but_labels_keep_original() {
        let src = source(Ok(timed_plan("MyUpgrade v2")), Ok(vec!["myupgrade+v2"]));
        let result = collect(&collector(src, None));

        let present = result.samples.last().expect("binary sample");
        assert_eq!(present.name(), MetricName::UpgradeBinaryPresent);
        assert_eq!(present.value(), 1.0);
        assert_eq!(present.label("name"), Some("MyUpgrade v2"));
        assert_eq!(present.label("info"), Some("scheduled by governance"));
    }

    #[test]
    fn missing_binary_reports_zero() {
        let src = source(Ok(timed_plan("v3")), Ok(vec!["v2"]));
        let result = collect(&collector(src, None));

        let present = result.samples.last().expect("binary sample");
        assert_eq!(present.name(), MetricName::UpgradeBinaryPresent);
        assert_eq!(present.value(), 0.0);
    }

    #[test]
    fn height_plan_is_estimated_via_rpc() {
        let src = source(Ok(height_plan("v15", "18500000")), Ok(vec!["v15"]));
        let r = rpc(true);
        let result = collect(&collector(src, Some(r.clone())));

        assert_eq!(result.samples.len(), 4);
        assert_eq!(result.samples[2].value(), UPGRADE_TS as f64);
        assert_eq!(r.last_height.load(Ordering::SeqCst), 18_500_000);
        assert_eq!(
            result.queries,
            vec![
                QueryRecord::success(ACTION_GET_UPGRADE_PLAN),
                QueryRecord::success(ACTION_GET_UPGRADE_TIME),
                QueryRecord::success(ACTION_GET_UPGRADES),
            ]
        );
    }

    #[test]
    fn estimation_failure_keeps_coming_and_info_only() {
        let src = source(Ok(height_plan("v15", "18500000")), Ok(vec!["v15"]));
        let result = collect(&collector(src.clone(), Some(rpc(false))));

        assert_eq!(
            names(&result),
            vec![MetricName::UpgradeComing, MetricName::UpgradeInfo]
        );
        assert_eq!(
            result.queries.last(),
            Some(&QueryRecord::failure(ACTION_GET_UPGRADE_TIME))
        );
        assert_eq!(src.upgrades_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unparsable_height_stops_without_query() {
        let src = source(Ok(height_plan("v15", "soon")), Ok(vec![]));
        let r = rpc(true);
        let result = collect(&collector(src, Some(r.clone())));

        assert_eq!(
            names(&result),
            vec![MetricName::UpgradeComing, MetricName::UpgradeInfo]
        );
        assert_eq!(
            result.queries,
            vec![QueryRecord::success(ACTION_GET_UPGRADE_PLAN)]
        );
        assert_eq!(r.estimate_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_rpc_stops_after_info() {
        let src = source(Ok(height_plan("v15", "100")), Ok(vec!["v15"]));
        let result = collect(&collector(src.clone(), None));

        assert_eq!(
            names(&result),
            vec![MetricName::UpgradeComing, MetricName::UpgradeInfo]
        );
        assert_eq!(result.samples[1].value(), 1.0);
        assert_eq!(
            result.queries,
            vec![QueryRecord::success(ACTION_GET_UPGRADE_PLAN)]
        );
        assert_eq!(src.upgrades_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn binary_lookup_failure_discards_all_samples() {
        let src = source(Ok(height_plan("v15", "18500000")), Err(()));
        let result = collect(&collector(src, Some(rpc(true))));

        assert!(result.samples.is_empty());
        assert_eq!(
            result.queries,
            vec![
                QueryRecord::success(ACTION_GET_UPGRADE_PLAN),
                QueryRecord::success(ACTION_GET_UPGRADE_TIME),
                QueryRecord::failure(ACTION_GET_UPGRADES),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn applied_upgrade_is_not_reported_as_coming() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        use crate::clients::Cosmovisor;

        let home = tempfile::tempdir().expect("tempdir");
        let data = home.path().join("data");
        fs::create_dir_all(&data).expect("create data dir");
        fs::write(data.join("upgrade-info.json"), r#"{"name":"v2","height":100}"#)
            .expect("write upgrade-info");
        let bin = home.path().join("cosmovisor/upgrades/v2/bin");
        fs::create_dir_all(&bin).expect("create bin dir");
        fs::write(bin.join("gaiad"), b"#!/bin/sh\n").expect("write binary");

        let script = home.path().join("fake-cosmovisor");
        fs::write(&script, "#!/bin/sh\necho 'Error: no upgrade scheduled' >&2\nexit 1\n")
            .expect("write script");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod script");

        let source = Cosmovisor::new(home.path(), home.path().join("cosmovisor"), "gaiad")
            .with_binary(&script);
        let r = rpc(false);
        let c = UpgradeCollector::new(
            "upgrades-querier",
            Some(Arc::new(source)),
            Some(r.clone() as Arc<dyn NodeRpc>),
        );
        let result = collect(&c);

        assert_eq!(names(&result), vec![MetricName::UpgradeComing]);
        assert_eq!(result.samples[0].value(), 0.0);
        assert_eq!(
            result.queries,
            vec![QueryRecord::success(ACTION_GET_UPGRADE_PLAN)]
        );
        assert_eq!(r.estimate_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn expired_deadline_fails_first_query() {
        let src = source(Ok(timed_plan("v2")), Ok(vec!["v2"]));
        let ctx = CollectContext::with_deadline(Instant::now() - Duration::from_millis(1));
        let result = collector(src.clone(), None).collect(&ctx);

        assert!(result.samples.is_empty());
        assert_eq!(
            result.queries,
            vec![QueryRecord::failure(ACTION_GET_UPGRADE_PLAN)]
        );
        assert_eq!(src.upgrades_calls.load(Ordering::SeqCst), 0);
    }
}
