#[cfg(test)]
mod tests {
    use crate::db::create_assessment;
    use crate::models::{FirstLevelAnswer, NewAssessment, SecondLevelAnswer};
    use crate::test::test_utils::{TestAssessment, TestDbBuilder, create_standard_test_db};

    #[rocket::async_test]
    async fn test_create_assessment_writes_every_answer() {
        let test_db = create_standard_test_db().await;

        let assessment = NewAssessment {
            company: "Acme".to_string(),
            department: "Sales".to_string(),
            role: Some("Analyst".to_string()),
            first_level_answers: vec![
                FirstLevelAnswer {
                    theme_id: test_db.theme_id(1),
                    selected: true,
                },
                FirstLevelAnswer {
                    theme_id: test_db.theme_id(2),
                    selected: false,
                },
            ],
            second_level_answers: vec![
                SecondLevelAnswer {
                    sub_theme_id: test_db.sub_theme_id(1, "a"),
                    discomfort_level: 3,
                },
                SecondLevelAnswer {
                    sub_theme_id: test_db.sub_theme_id(1, "b"),
                    discomfort_level: 0,
                },
                SecondLevelAnswer {
                    sub_theme_id: test_db.sub_theme_id(1, "c"),
                    discomfort_level: 4,
                },
            ],
        };

        let id = create_assessment(&test_db.pool, &assessment)
            .await
            .expect("Failed to create assessment");

        assert_eq!(test_db.count_rows("assessments").await, 1);
        assert_eq!(test_db.count_rows("first_level_answers").await, 2);
        assert_eq!(test_db.count_rows("second_level_answers").await, 3);

        let (company, department, role): (String, String, Option<String>) =
            sqlx::query_as("SELECT company, department, role FROM assessments WHERE id = ?")
                .bind(id)
                .fetch_one(&test_db.pool)
                .await
                .unwrap();
        assert_eq!(company, "Acme");
        assert_eq!(department, "Sales");
        assert_eq!(role.as_deref(), Some("Analyst"));
    }

    #[rocket::async_test]
    async fn test_assessment_without_role_or_answers() {
        let test_db = TestDbBuilder::new()
            .assessment(TestAssessment::new("Acme", "Sales"))
            .build()
            .await
            .expect("Failed to build test database");

        assert_eq!(test_db.assessment_ids.len(), 1);
        assert_eq!(test_db.count_rows("assessments").await, 1);
        assert_eq!(test_db.count_rows("first_level_answers").await, 0);
    }

    #[rocket::async_test]
    async fn test_failed_answer_rolls_back_assessment() {
        let test_db = create_standard_test_db().await;

        let assessment = NewAssessment {
            company: "Acme".to_string(),
            department: "Sales".to_string(),
            role: None,
            first_level_answers: vec![FirstLevelAnswer {
                theme_id: test_db.theme_id(1),
                selected: true,
            }],
            second_level_answers: vec![
                SecondLevelAnswer {
                    sub_theme_id: test_db.sub_theme_id(1, "a"),
                    discomfort_level: 2,
                },
                // Violates the discomfort level check constraint.
                SecondLevelAnswer {
                    sub_theme_id: test_db.sub_theme_id(1, "b"),
                    discomfort_level: 9,
                },
            ],
        };

        let result = create_assessment(&test_db.pool, &assessment).await;
        assert!(result.is_err());

        assert_eq!(test_db.count_rows("assessments").await, 0);
        assert_eq!(test_db.count_rows("first_level_answers").await, 0);
        assert_eq!(test_db.count_rows("second_level_answers").await, 0);
    }

    #[rocket::async_test]
    async fn test_unknown_theme_is_rejected_by_store() {
        let test_db = create_standard_test_db().await;

        let assessment = NewAssessment {
            company: "Acme".to_string(),
            department: "Sales".to_string(),
            role: None,
            first_level_answers: vec![FirstLevelAnswer {
                theme_id: 9_999,
                selected: true,
            }],
            second_level_answers: Vec::new(),
        };

        assert!(create_assessment(&test_db.pool, &assessment).await.is_err());
        assert_eq!(test_db.count_rows("assessments").await, 0);
    }
}
