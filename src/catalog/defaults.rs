use phf::phf_ordered_map;

/// Hostname fragments seen in MX names and EHLO greetings.
pub(crate) const HOSTNAME_PROVIDERS: phf::OrderedMap<&'static str, &'static str> = phf_ordered_map! {
    "outlook.com" => "Microsoft Exchange",
    "exchangelabs.com" => "Microsoft Exchange",
    "microsoft.com" => "Microsoft Exchange",
    "exchange.ms" => "Microsoft Exchange",
    "hotmail.com" => "Windows Live/Hotmail",
    "google.com" => "Google",
    "googlemail.com" => "Google",
    "aol.com" => "AOL",
    "yahoodns.net" => "Yahoo! Calendar",
    "mac.com" => "Apple MobileMe/iCloud",
    "mobile.me" => "Apple MobileMe/iCloud",
};

/// Vendor ESMTP extensions (see Exchange "SMTP extensions" on TechNet).
pub(crate) const CAPABILITY_PROVIDERS: phf::OrderedMap<&'static str, &'static str> = phf_ordered_map! {
    "XEXCH50" => "Microsoft Exchange",
    "X-EXPS" => "Microsoft Exchange",
};
