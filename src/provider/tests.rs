use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use proptest::prelude::*;

use super::{FailureKind, ProviderResolver, ResolutionResult, ResolveOptions, RunMode};
use crate::cancel::CancelToken;
use crate::catalog::ProviderCatalog;
use crate::mx::tests::StubResolver;
use crate::mx::{DnsFailure, MxRecord};
use crate::probe::{EhloProbe, EhloTranscript};

/// Scripted EHLO answers keyed by exchange host; unknown hosts refuse.
#[derive(Default)]
struct StubProbe {
    replies: HashMap<String, Vec<String>>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
}

impl StubProbe {
    fn reply(mut self, host: &str, lines: &[&str]) -> Self {
        self.replies
            .insert(host.to_string(), lines.iter().map(|l| l.to_string()).collect());
        self
    }

    fn delay(mut self, host: &str, delay: Duration) -> Self {
        self.delays.insert(host.to_string(), delay);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl EhloProbe for StubProbe {
    fn probe(
        &self,
        exchange_host: &str,
        _timeout: Duration,
        cancel: &CancelToken,
    ) -> EhloTranscript {
        self.calls
            .lock()
            .expect("calls lock")
            .push(exchange_host.to_string());
        if let Some(delay) = self.delays.get(exchange_host) {
            thread::sleep(*delay);
        }
        if cancel.is_cancelled() {
            return EhloTranscript {
                cancelled: true,
                ..EhloTranscript::new(exchange_host)
            };
        }
        match self.replies.get(exchange_host) {
            Some(lines) => EhloTranscript {
                response_lines: lines.clone(),
                ..EhloTranscript::new(exchange_host)
            },
            None => EhloTranscript::connect_failed(exchange_host, "connection refused"),
        }
    }
}

fn unreachable_dns() -> StubResolver {
    StubResolver::new(|domain| panic!("DNS must not be queried for {domain}"))
}

fn resolver_with(
    lookup: StubResolver,
    probe: StubProbe,
    options: ResolveOptions,
) -> ProviderResolver<StubResolver, StubProbe> {
    ProviderResolver::with_parts(ProviderCatalog::default(), options, lookup, probe)
}

fn assert_invariant(result: &ResolutionResult) {
    assert_ne!(
        result.provider.is_some(),
        result.failure_reason.is_some(),
        "exactly one of provider/failure_reason must be set: {result:?}"
    );
    assert_eq!(result.failure.is_some(), result.failure_reason.is_some());
}

#[test]
fn empty_address_fails_without_dns() {
    let resolver = resolver_with(unreachable_dns(), StubProbe::default(), ResolveOptions::default());
    let result = resolver.resolve("");
    assert_invariant(&result);
    assert_eq!(result.failure_reason.as_deref(), Some("email address is empty"));
    assert_eq!(result.failure, Some(FailureKind::EmptyAddress));
    assert!(result.provider.is_none());
}

#[test]
fn invalid_address_fails_without_dns() {
    let resolver = resolver_with(unreachable_dns(), StubProbe::default(), ResolveOptions::default());
    let result = resolver.resolve("not-an-email");
    assert_invariant(&result);
    insta::assert_snapshot!(
        result.failure_reason.unwrap_or_default(),
        @"invalid email address: not-an-email"
    );
    assert_eq!(result.failure, Some(FailureKind::InvalidAddress));
}

#[test]
fn dns_query_error_is_reported() {
    let lookup = StubResolver::new(|domain| Err(DnsFailure::query(domain, "SERVFAIL")));
    let resolver = resolver_with(lookup, StubProbe::default(), ResolveOptions::default());
    let result = resolver.resolve("user@example.com");
    assert_invariant(&result);
    assert_eq!(
        result.failure_reason.as_deref(),
        Some("DNS lookup failed for example.com")
    );
    assert_eq!(result.failure, Some(FailureKind::DnsQuery));
}

#[test]
fn no_mx_records_leaves_details_empty() {
    let resolver = resolver_with(
        StubResolver::records(Vec::new()),
        StubProbe::default(),
        ResolveOptions::default(),
    );
    let result = resolver.resolve("user@example.com");
    assert_invariant(&result);
    assert_eq!(
        result.failure_reason.as_deref(),
        Some("no mail-exchange records for example.com")
    );
    assert!(result.details.is_empty());
}

#[test]
fn lookup_receives_ascii_domain() {
    let lookup = StubResolver::new(|domain| {
        assert_eq!(domain, "xn--exmple-cua.com");
        Ok(Vec::new())
    });
    let resolver = resolver_with(lookup, StubProbe::default(), ResolveOptions::default());
    let result = resolver.resolve("user@Exämple.com");
    assert_eq!(result.failure, Some(FailureKind::NoRecords));
}

#[test]
fn hostname_match_in_fast_mode_skips_probe() {
    let lookup = StubResolver::records(vec![MxRecord::new(
        0,
        "bizlogr-com.mail.protection.outlook.com",
    )]);
    let resolver = resolver_with(lookup, StubProbe::default(), ResolveOptions::default());
    let result = resolver.resolve("charlie@bizlogr.com");
    assert_invariant(&result);
    assert_eq!(result.provider.as_deref(), Some("Microsoft Exchange"));
    insta::assert_snapshot!(
        result.clue.unwrap_or_default(),
        @"The domain name of the MX host is bizlogr-com.mail.protection.outlook.com."
    );
    assert!(result.details.is_empty());
    assert!(resolver.probe.calls().is_empty());
}

#[test]
fn capability_token_in_transcript_matches() {
    let lookup = StubResolver::records(vec![MxRecord::new(10, "mail.oddie.com.au")]);
    let probe = StubProbe::default().reply(
        "mail.oddie.com.au",
        &[
            "220 mail.oddie.com.au Microsoft ESMTP MAIL Service ready",
            "250-mail.oddie.com.au Hello",
            "250-PIPELINING",
            "250-XEXCH50",
            "250 OK",
        ],
    );
    let resolver = resolver_with(lookup, probe, ResolveOptions::default());
    let result = resolver.resolve("user@oddie.com.au");
    assert_invariant(&result);
    assert_eq!(result.provider.as_deref(), Some("Microsoft Exchange"));
    insta::assert_snapshot!(
        result.clue.unwrap_or_default(),
        @"The SMTP server claims in its EHLO response to support 250-XEXCH50, which is a proprietary extension."
    );
    assert_eq!(result.details.len(), 1);
    assert_eq!(result.details[0].priority, 10);
}

#[test]
fn hostname_claimed_in_ehlo_matches() {
    let lookup = StubResolver::records(vec![MxRecord::new(5, "mx.contoso.example")]);
    let probe = StubProbe::default().reply(
        "mx.contoso.example",
        &[
            "220 BAY0-MC1-F12.Bay0.hotmail.com Sending unsolicited commercial mail prohibited",
            "250 BAY0-MC1-F12.Bay0.hotmail.com Hello",
        ],
    );
    let resolver = resolver_with(lookup, probe, ResolveOptions::default());
    let result = resolver.resolve("someone@contoso.example");
    assert_eq!(result.provider.as_deref(), Some("Windows Live/Hotmail"));
    assert!(
        result
            .clue
            .as_deref()
            .is_some_and(|clue| clue.starts_with("The domain name the SMTP server claims"))
    );
}

fn three_mx() -> StubResolver {
    StubResolver::records(vec![
        MxRecord::new(30, "mx3.contoso.example"),
        MxRecord::new(10, "mx1.contoso.example"),
        MxRecord::new(20, "mx2.contoso.example"),
    ])
}

fn three_replies() -> StubProbe {
    StubProbe::default()
        .reply("mx1.contoso.example", &["220 mx1 ready", "250 mx1"])
        .reply("mx2.contoso.example", &["220 mx2 ready", "250-XEXCH50", "250 OK"])
        .reply("mx3.contoso.example", &["220 mx3.google.com ready", "250 OK"])
}

#[test]
fn fast_mode_stops_after_first_match() {
    let resolver = resolver_with(three_mx(), three_replies(), ResolveOptions::default());
    let result = resolver.resolve("user@contoso.example");
    assert_eq!(result.provider.as_deref(), Some("Microsoft Exchange"));
    let hosts: Vec<_> = result.details.iter().map(|d| d.exchange_host.as_str()).collect();
    assert_eq!(hosts, ["mx1.contoso.example", "mx2.contoso.example"]);
    assert_eq!(resolver.probe.calls().len(), 2);
}

#[test]
fn diagnostic_mode_probes_every_host_in_priority_order() {
    let resolver = resolver_with(three_mx(), three_replies(), ResolveOptions::diagnostic());
    let result = resolver.resolve("user@contoso.example");
    assert_eq!(result.provider.as_deref(), Some("Microsoft Exchange"));
    let order: Vec<_> = result.details.iter().map(|d| d.priority).collect();
    assert_eq!(order, [10, 20, 30]);
}

#[test]
fn diagnostic_mode_keeps_first_evidence() {
    let lookup = StubResolver::records(vec![
        MxRecord::new(1, "aspmx.l.google.com"),
        MxRecord::new(2, "contoso.mail.protection.outlook.com"),
    ]);
    let probe = StubProbe::default()
        .reply("aspmx.l.google.com", &["220 mx.google.com ESMTP", "250 mx.google.com"])
        .reply(
            "contoso.mail.protection.outlook.com",
            &["220 outlook.com", "250 OK"],
        );
    let resolver = resolver_with(lookup, probe, ResolveOptions::diagnostic());
    let result = resolver.resolve("user@contoso.example");
    assert_eq!(result.provider.as_deref(), Some("Google"));
    assert_eq!(result.details.len(), 2);
    assert_eq!(resolver.probe.calls().len(), 2);
}

#[test]
fn parallel_diagnostic_probes_keep_priority_order() {
    let probe = three_replies()
        .delay("mx1.contoso.example", Duration::from_millis(120))
        .delay("mx2.contoso.example", Duration::from_millis(60));
    let options = ResolveOptions {
        parallel_probes: true,
        ..ResolveOptions::diagnostic()
    };
    let resolver = resolver_with(three_mx(), probe, options);
    let result = resolver.resolve("user@contoso.example");
    let hosts: Vec<_> = result.details.iter().map(|d| d.exchange_host.as_str()).collect();
    assert_eq!(
        hosts,
        ["mx1.contoso.example", "mx2.contoso.example", "mx3.contoso.example"]
    );
    assert_eq!(result.provider.as_deref(), Some("Microsoft Exchange"));
}

#[test]
fn unreachable_host_does_not_abort_scan() {
    let lookup = StubResolver::records(vec![
        MxRecord::new(10, "down.contoso.example"),
        MxRecord::new(20, "up.contoso.example"),
    ]);
    let probe = StubProbe::default().reply("up.contoso.example", &["220 up", "250-X-EXPS GSSAPI NTLM", "250 OK"]);
    let resolver = resolver_with(lookup, probe, ResolveOptions::default());
    let result = resolver.resolve("user@contoso.example");
    assert_invariant(&result);
    assert_eq!(result.provider.as_deref(), Some("Microsoft Exchange"));
    assert!(result.details[0].connect_error.is_some());
    assert!(result.details[0].response_lines.is_empty());
}

#[test]
fn sole_unreachable_host_is_the_failure_reason() {
    let lookup = StubResolver::records(vec![MxRecord::new(10, "down.contoso.example")]);
    let resolver = resolver_with(lookup, StubProbe::default(), ResolveOptions::default());
    let result = resolver.resolve("user@contoso.example");
    assert_invariant(&result);
    assert_eq!(result.failure, Some(FailureKind::ProbeConnection));
    assert_eq!(
        result.failure_reason.as_deref(),
        Some("could not connect to mail exchange down.contoso.example for contoso.example")
    );
    assert_eq!(result.details.len(), 1);
}

#[test]
fn no_match_keeps_gathered_details() {
    let lookup = StubResolver::records(vec![
        MxRecord::new(10, "mx1.contoso.example"),
        MxRecord::new(20, "down.contoso.example"),
    ]);
    let probe = StubProbe::default().reply("mx1.contoso.example", &["220 mx1", "250 mx1"]);
    let resolver = resolver_with(lookup, probe, ResolveOptions::default());
    let result = resolver.resolve("user@contoso.example");
    assert_invariant(&result);
    assert_eq!(
        result.failure_reason.as_deref(),
        Some("could not determine the email provider for contoso.example")
    );
    assert_eq!(result.failure, Some(FailureKind::NoMatch));
    assert_eq!(result.details.len(), 2);
}

#[test]
fn cancelled_before_start_is_not_a_miss() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let options = ResolveOptions::default().with_cancel(cancel);
    let resolver = resolver_with(unreachable_dns(), StubProbe::default(), options);
    let result = resolver.resolve("user@contoso.example");
    assert_invariant(&result);
    assert_eq!(result.failure, Some(FailureKind::Cancelled));
    assert_eq!(
        result.failure_reason.as_deref(),
        Some("resolution cancelled for contoso.example")
    );
}

#[test]
fn cancellation_during_probe_is_reported() {
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let lookup = StubResolver::new(move |_| {
        trigger.cancel();
        Ok(vec![MxRecord::new(10, "mx1.contoso.example")])
    });
    let options = ResolveOptions::default().with_cancel(cancel);
    let resolver = resolver_with(lookup, three_replies(), options);
    let result = resolver.resolve("user@contoso.example");
    assert_eq!(result.failure, Some(FailureKind::Cancelled));
}

#[test]
fn dns_timeout_is_capped_by_deadline() {
    let options =
        ResolveOptions::default().with_cancel(CancelToken::with_deadline(Duration::from_secs(1)));
    let resolver = resolver_with(
        StubResolver::records(Vec::new()),
        StubProbe::default(),
        options,
    );
    resolver.resolve("user@contoso.example");
    let timeouts = resolver.lookup.timeouts.lock().expect("timeouts lock").clone();
    assert_eq!(timeouts.len(), 1);
    assert!(timeouts[0] <= Duration::from_secs(1), "{timeouts:?}");
}

#[test]
fn dns_timeout_defaults_to_option_timeout() {
    let options = ResolveOptions::default().with_timeout(Duration::from_millis(1500));
    let resolver = resolver_with(
        StubResolver::records(Vec::new()),
        StubProbe::default(),
        options,
    );
    resolver.resolve("user@contoso.example");
    assert_eq!(
        *resolver.lookup.timeouts.lock().expect("timeouts lock"),
        [Duration::from_millis(1500)]
    );
}

#[test]
fn repeated_mx_records_are_probed_once() {
    let lookup = StubResolver::records(vec![
        MxRecord::new(10, "mx1.contoso.example"),
        MxRecord::new(20, "mx2.contoso.example"),
        MxRecord::new(10, "mx3.contoso.example"),
        MxRecord::new(10, "mx1.contoso.example"),
        MxRecord::new(20, "mx2.contoso.example"),
    ]);
    let resolver = resolver_with(lookup, three_replies(), ResolveOptions::diagnostic());
    let result = resolver.resolve("user@contoso.example");
    let hosts: Vec<_> = result.details.iter().map(|d| d.exchange_host.as_str()).collect();
    assert_eq!(
        hosts,
        ["mx1.contoso.example", "mx3.contoso.example", "mx2.contoso.example"]
    );
    assert_eq!(resolver.probe.calls(), hosts);
}

#[test]
fn custom_catalog_is_honoured() {
    let catalog = ProviderCatalog::empty().with_hostname("mx.fastmail.com", "Fastmail");
    let lookup = StubResolver::records(vec![MxRecord::new(10, "in1-smtp.messagingengine.com")]);
    let probe = StubProbe::default().reply(
        "in1-smtp.messagingengine.com",
        &["220 mx.fastmail.com ESMTP ready", "250 OK"],
    );
    let resolver =
        ProviderResolver::with_parts(catalog, ResolveOptions::default(), lookup, probe);
    let result = resolver.resolve("Jane <jane@fastmail.example>");
    assert_eq!(result.provider.as_deref(), Some("Fastmail"));
    assert_eq!(result.email_address, "Jane <jane@fastmail.example>");
}

#[test]
fn repeated_resolution_is_stable() {
    let resolver = resolver_with(three_mx(), three_replies(), ResolveOptions::default());
    let first = resolver.resolve("user@contoso.example");
    let second = resolver.resolve("user@contoso.example");
    assert_eq!(first.provider, second.provider);
    assert_eq!(first.failure_reason, second.failure_reason);
}

#[test]
fn run_mode_defaults_to_fast() {
    let resolver = resolver_with(three_mx(), three_replies(), ResolveOptions::default());
    assert_eq!(resolver.options().mode, RunMode::Fast);
    assert_eq!(resolver.catalog(), &ProviderCatalog::default());
}

#[cfg(feature = "with-serde")]
#[test]
fn result_serializes_with_camel_case_fields() {
    let lookup = StubResolver::records(vec![MxRecord::new(10, "mx1.contoso.example")]);
    let probe = StubProbe::default().reply("mx1.contoso.example", &["220 mx1", "250 mx1"]);
    let resolver = resolver_with(lookup, probe, ResolveOptions::default());
    let result = resolver.resolve("user@contoso.example");
    let value = serde_json::to_value(&result).expect("serialize");
    assert_eq!(value["emailAddress"], "user@contoso.example");
    assert!(value["provider"].is_null());
    assert!(value["clue"].is_null());
    assert_eq!(
        value["failureReason"],
        "could not determine the email provider for contoso.example"
    );
    assert_eq!(value["details"][0]["exchangeHost"], "mx1.contoso.example");
    assert_eq!(value["details"][0]["responseLines"][1], "250 mx1");
    assert!(value.get("failure").is_none());
}

proptest! {
    #[test]
    fn blank_input_is_always_empty(input in "[ \t\r\n]{0,12}") {
        let resolver = resolver_with(unreachable_dns(), StubProbe::default(), ResolveOptions::default());
        let result = resolver.resolve(&input);
        prop_assert_eq!(result.failure_reason.as_deref(), Some("email address is empty"));
        prop_assert!(result.provider.is_none());
    }

    #[test]
    fn at_less_input_never_reaches_dns(input in "[a-z0-9.+-]{1,30}") {
        let resolver = resolver_with(unreachable_dns(), StubProbe::default(), ResolveOptions::default());
        let result = resolver.resolve(&input);
        prop_assert_eq!(result.failure, Some(FailureKind::InvalidAddress));
    }
}
