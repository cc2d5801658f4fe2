//! Tool schema definitions.

use super::ToolDefinition;
use serde_json::json;

/// Defines the search tool.
pub fn search_tool() -> ToolDefinition {
    ToolDefinition {
        name: "search".to_string(),
        description: "Intelligent search across Quilt catalogs, packages, and S3 buckets \
                      with distinct package and object search types"
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "description": "Operation to perform",
                    "enum": ["discover", "unified_search", "search_packages", "search_objects", "bucket_search", "suggest"]
                },
                "params": {
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "Natural language search query"},
                        "partial_query": {"type": "string", "description": "Partial query for suggestions"},
                        "scope": {
                            "type": "string",
                            "description": "Search scope",
                            "enum": ["global", "catalog", "bucket", "package"]
                        },
                        "target": {"type": "string", "description": "Bucket or package name when the scope is narrow"},
                        "bucket": {"type": "string", "description": "Alias for target on bucket-scoped searches"},
                        "search_type": {
                            "type": "string",
                            "enum": ["auto", "packages", "objects", "both"],
                            "default": "auto"
                        },
                        "backends": {
                            "type": "array",
                            "items": {"type": "string", "enum": ["graphql", "s3"]},
                            "description": "Preferred backends (default: graphql)"
                        },
                        "limit": {"type": "integer", "minimum": 0, "maximum": 1000, "default": 20},
                        "offset": {"type": "integer", "minimum": 0, "default": 0},
                        "page": {"type": "integer", "minimum": 1, "description": "1-based page, alternative to offset"},
                        "filters": {
                            "type": "object",
                            "properties": {
                                "file_extensions": {"type": "array", "items": {"type": "string"}},
                                "size_min": {"type": "integer"},
                                "size_max": {"type": "integer"}
                            }
                        }
                    }
                }
            },
            "required": []
        }),
    }
}

/// Defines the packaging tool.
pub fn packaging_tool() -> ToolDefinition {
    ToolDefinition {
        name: "packaging".to_string(),
        description: "Package management: browse, create, update, and delete Quilt packages. \
                      README content in metadata is always extracted into a README.md file"
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": [
                        "browse", "create", "update", "delete",
                        "metadata_templates", "get_template"
                    ]
                },
                "params": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string", "description": "Package name (namespace/packagename)"},
                        "bucket": {"type": "string", "description": "Bucket holding the package (browse)"},
                        "files": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "S3 URIs to include (s3://bucket/key)"
                        },
                        "description": {"type": "string"},
                        "metadata": {
                            "description": "Package metadata as a JSON object or a string of JSON"
                        },
                        "template": {
                            "type": "string",
                            "enum": ["standard", "dataset", "ml"],
                            "description": "Metadata template to overlay under the user metadata"
                        },
                        "registry": {"type": "string", "description": "Target registry bucket (auto-selected when omitted)"},
                        "message": {"type": "string", "description": "Revision message"},
                        "auto_organize": {"type": "boolean", "default": true, "description": "Smart folder layout (false = flat)"},
                        "copy_mode": {"type": "string", "enum": ["all", "none", "same_bucket"], "default": "all"},
                        "dry_run": {"type": "boolean", "default": false},
                        "generate_readme": {"type": "boolean", "default": false},
                        "generate_summary": {"type": "boolean", "default": false},
                        "visualization": {
                            "type": "object",
                            "description": "Chart spec for a generated dashboard",
                            "properties": {
                                "data": {"type": "array", "items": {"type": "object"}},
                                "plot_type": {"type": "string", "enum": ["bar", "line", "scatter"]},
                                "x_column": {"type": "string"},
                                "y_column": {"type": "string"},
                                "title": {"type": "string"}
                            },
                            "required": ["data", "x_column", "y_column"]
                        },
                        "template_name": {"type": "string", "description": "Template to fetch (get_template)"}
                    }
                }
            },
            "required": []
        }),
    }
}

/// Defines the buckets tool (S3 object operations).
pub fn buckets_tool() -> ToolDefinition {
    ToolDefinition {
        name: "buckets".to_string(),
        description: "Direct S3 object operations with the caller's AWS identity: list, \
                      inspect, fetch, and upload objects"
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": [
                        "objects_list", "object_info", "object_text",
                        "object_fetch", "objects_put"
                    ]
                },
                "params": {
                    "type": "object",
                    "properties": {
                        "bucket": {"type": "string", "description": "Bucket name"},
                        "key": {"type": "string", "description": "Object key"},
                        "prefix": {"type": "string", "description": "Listing prefix"},
                        "max_keys": {"type": "integer", "minimum": 1, "maximum": 1000, "default": 100},
                        "continuation_token": {"type": "string"},
                        "max_bytes": {"type": "integer", "description": "Byte cap for object_text/object_fetch"},
                        "content": {"type": "string", "description": "Body for objects_put (UTF-8)"}
                    }
                }
            },
            "required": []
        }),
    }
}

/// Defines the permissions tool.
pub fn permissions_tool() -> ToolDefinition {
    ToolDefinition {
        name: "permissions".to_string(),
        description: "AWS permission discovery and bucket recommendations based on the \
                      caller's actual access levels"
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["discover", "access_check", "recommendations_get"]
                },
                "params": {
                    "type": "object",
                    "properties": {
                        "check_buckets": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Specific buckets to check (discover)"
                        },
                        "force_refresh": {"type": "boolean", "default": false},
                        "bucket_name": {"type": "string", "description": "Bucket to check (access_check)"},
                        "source_bucket": {"type": "string", "description": "Context bucket for scoring"},
                        "operation_type": {"type": "string", "default": "package_creation"},
                        "user_context": {"type": "object", "description": "Department/project context for scoring"}
                    }
                }
            },
            "required": []
        }),
    }
}

/// Defines the governance tool.
pub fn governance_tool() -> ToolDefinition {
    ToolDefinition {
        name: "governance".to_string(),
        description: "Catalog administration: users, roles, SSO configuration, policies, \
                      and tabulator tables"
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": [
                        "users_list", "user_get", "user_create", "user_delete",
                        "user_set_email", "user_set_admin", "user_set_active", "user_set_role",
                        "roles_list", "role_create", "role_delete",
                        "sso_config_get", "sso_config_set",
                        "policies_list", "policy_get", "policy_create_managed",
                        "policy_create_unmanaged", "policy_update_managed", "policy_delete",
                        "tabulator_list", "tabulator_create", "tabulator_rename",
                        "tabulator_delete", "tabulator_open_query_get", "tabulator_open_query_set"
                    ]
                },
                "params": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "email": {"type": "string"},
                        "role": {"type": "string"},
                        "extra_roles": {"type": "array", "items": {"type": "string"}},
                        "admin": {"type": "boolean"},
                        "active": {"type": "boolean"},
                        "arn": {"type": "string"},
                        "role_id": {"type": "string"},
                        "config": {"description": "SSO config JSON (object or string); null removes it"},
                        "policy_id": {"type": "string"},
                        "title": {"type": "string"},
                        "permissions": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "bucket": {"type": "string"},
                                    "level": {"type": "string", "enum": ["READ", "READ_WRITE"]}
                                }
                            }
                        },
                        "roles": {"type": "array", "items": {"type": "string"}},
                        "bucket_name": {"type": "string"},
                        "table_name": {"type": "string"},
                        "new_table_name": {"type": "string"},
                        "config_yaml": {"type": "string"},
                        "enabled": {"type": "boolean"}
                    }
                }
            },
            "required": []
        }),
    }
}

/// Defines the workflow tool.
pub fn workflow_tool() -> ToolDefinition {
    ToolDefinition {
        name: "workflow".to_string(),
        description: "Track multi-step operations as workflows with dependent steps"
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["create", "add_step", "update_step", "get_status", "list", "cancel"]
                },
                "params": {
                    "type": "object",
                    "properties": {
                        "workflow_id": {"type": "string"},
                        "name": {"type": "string"},
                        "description": {"type": "string"},
                        "step_id": {"type": "string"},
                        "dependencies": {"type": "array", "items": {"type": "string"}},
                        "status": {
                            "type": "string",
                            "enum": ["pending", "in_progress", "completed", "failed", "skipped"]
                        },
                        "result": {"type": "object"},
                        "error_message": {"type": "string"}
                    }
                }
            },
            "required": []
        }),
    }
}
