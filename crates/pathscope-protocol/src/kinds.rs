//! Node and relationship kind names as emitted by the backend graph schema.

pub const AWS_ACCOUNT: &str = "AWSAccount";
pub const AWS_ROLE: &str = "AWSRole";
pub const AWS_USER: &str = "AWSUser";
pub const AWS_GROUP: &str = "AWSGroup";
pub const AWS_MANAGED_POLICY: &str = "AWSManagedPolicy";
pub const AWS_INLINE_POLICY: &str = "AWSInlinePolicy";
pub const AWS_POLICY_DOCUMENT: &str = "AWSPolicyDocument";
pub const AWS_STATEMENT: &str = "AWSStatement";
pub const AWS_ASSUME_ROLE_POLICY: &str = "AWSAssumeRolePolicy";
pub const AWS_POLICY_VERSION: &str = "AWSPolicyVersion";
pub const AWS_RESOURCE_TYPE: &str = "AWSResourceType";
pub const AWS_RESOURCE_BLOB: &str = "AWSResourceBlob";
pub const AWS_ACTION_BLOB: &str = "AWSActionBlob";
pub const AWS_ACTION: &str = "AWSAction";
pub const AWS_CONDITION: &str = "AWSCondition";
pub const AWS_CONDITION_KEY: &str = "AWSConditionKey";
pub const AWS_CONDITION_VALUE: &str = "AWSConditionValue";
pub const AWS_CONDITION_OPERATOR: &str = "AWSConditionOperator";
pub const UNIQUE_ARN: &str = "UniqueArn";
pub const UNIQUE_NAME: &str = "UniqueName";

pub mod rel {
    pub const ACTS_ON: &str = "ActsOn";
    pub const ALLOW_ACTION: &str = "AllowAction";
    pub const ATTACHED_TO: &str = "AttachedTo";
    pub const DENY_ACTION: &str = "DenyAction";
    pub const EXPANDS_TO: &str = "ExpandsTo";
    pub const IN_ACCOUNT: &str = "InAccount";
    pub const MEMBER_OF: &str = "MemberOf";
    pub const ON_RESOURCE: &str = "OnResource";
    pub const TYPE_OF: &str = "TypeOf";
    pub const IDENTITY_TRANSFORM: &str = "IdentityTransform";
}

/// Kinds the node explorer can list beneath an account.
pub const EXPLORABLE: &[&str] = &[AWS_MANAGED_POLICY, AWS_ROLE, AWS_USER, AWS_GROUP];
