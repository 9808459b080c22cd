//! Model training module
//!
//! Native classifiers for the phishing-indicator features and the model
//! selection stage built on them:
//! - Decision trees and Random Forests
//! - Gradient boosting (log-loss)
//! - AdaBoost (SAMME with stumps)
//! - Logistic regression
//! - Stratified k-fold cross-validation and grid search
//! - The trainer that picks, persists and tracks the best model

pub mod adaboost;
pub mod candidates;
pub mod cross_validation;
pub mod decision_tree;
mod estimator;
pub mod gradient_boosting;
pub mod logistic_regression;
pub mod metrics;
mod network_model;
pub mod random_forest;
pub mod search;
mod trainer;

pub use adaboost::AdaBoostClassifier;
pub use candidates::{default_menu, EstimatorSpec, ModelCandidate};
pub use cross_validation::{CVResults, CVSplit, CVStrategy, CrossValidator};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use estimator::TrainedModel;
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use logistic_regression::LogisticRegression;
pub use metrics::{get_classification_score, ConfusionCounts, SelectionMetric};
pub use network_model::NetworkModel;
pub use random_forest::{MaxFeatures, RandomForest};
pub use search::{GridPointResult, GridSearch, SearchResult};
pub use trainer::{CandidateReport, ModelTrainer, SelectionReport};
