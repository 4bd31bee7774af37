mod contract_rules;
mod record_codec;
