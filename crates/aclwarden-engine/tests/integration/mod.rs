mod audit_flow;
mod enforce_flow;
mod walk_pruning;
