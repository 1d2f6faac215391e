//! Cloud provider modules.
//!
//! Module logic is written against small client traits so it can run against
//! in-memory fakes. The AWS SDK implementations of those traits are gated
//! behind the `aws` feature:
//!
//! - `aws`: AutoScaling, CloudWatch Logs, Elasticsearch, RDS and KMS clients
//!
//! ## Example
//!
//! ```yaml
//! - name: Simple scale down policy
//!   ec2_scaling_policy:
//!     name: scaledown-policy
//!     asg_name: application-asg
//!     adjustment_type: ChangeInCapacity
//!     scaling_adjustment: -1
//!     cooldown: 300
//! ```

pub mod aws;

pub use aws::{
    CloudWatchLogModule, ElasticsearchFactsModule, RdsInstanceFactsModule, ScalingPolicyModule,
};
