use std::sync::Arc;
use std::time::Duration;

use exam_core::model::{
    AnswerOption, ExamId, ExamMode, ExamOverview, ExamPartInfo, GroupId, OptionId, OptionLetter,
    PartData, PartId, PartNumber, Question, QuestionGroup, QuestionId,
};
use services::{
    ExamRuntime, ExamSession, InMemoryExamApi, LoadError, NoticeKind, PartFetchPolicy, Redirect,
    ServicesConfig, SessionDeps, SessionError, SessionEvent, SessionRequest,
};
use tokio::time;

fn part(id: u64, number: u8) -> PartData {
    let options = vec![
        AnswerOption {
            option_id: OptionId::new(id * 10),
            letter: OptionLetter::A,
            text: None,
        },
        AnswerOption {
            option_id: OptionId::new(id * 10 + 1),
            letter: OptionLetter::B,
            text: None,
        },
    ];
    PartData {
        part_id: PartId::new(id),
        part_number: PartNumber::new(number).unwrap(),
        part_name: format!("Part {number}"),
        description: None,
        groups: vec![QuestionGroup {
            group_id: GroupId::new(id),
            image_url: None,
            audio_url: None,
            passage_text: Some("Read the notice.".into()),
            questions: vec![Question::new(QuestionId::new(id), 1, None, options).unwrap()],
        }],
    }
}

fn backend() -> InMemoryExamApi {
    let api = InMemoryExamApi::new();
    api.insert_exam(ExamOverview {
        exam_id: ExamId::new(8),
        title: None,
        parts: [(6, 6), (7, 7)]
            .into_iter()
            .map(|(id, number)| ExamPartInfo {
                part_id: PartId::new(id),
                part_number: PartNumber::new(number).unwrap(),
                part_name: format!("Part {number}"),
            })
            .collect(),
    });
    api.insert_part(part(6, 6));
    api.insert_part(part(7, 7));
    api
}

async fn start(api: &InMemoryExamApi, policy: PartFetchPolicy) -> (ExamRuntime, tokio::sync::mpsc::UnboundedReceiver<SessionEvent>) {
    let config = ServicesConfig::new(ServicesConfig::DEFAULT_BASE_URL)
        .unwrap()
        .with_part_fetch_policy(policy);
    let deps = SessionDeps::new(Arc::new(api.clone()), config);
    let request = SessionRequest::new(ExamId::new(8), ExamMode::Partial)
        .with_parts("6,7")
        .with_time(exam_core::model::TimeParam::Minutes(30));
    let session = ExamSession::start(request, deps, Duration::ZERO).await.unwrap();
    ExamRuntime::spawn(session)
}

#[tokio::test(start_paused = true)]
async fn stay_and_retry_keeps_the_attempt_alive() {
    let api = backend();
    api.fail_part(PartId::new(7));
    let (runtime, _events) = start(&api, PartFetchPolicy::StayAndRetry).await;

    let err = runtime.go_to_part(1).await.unwrap_err();
    assert!(matches!(err, SessionError::Load(LoadError::Fetch(_))));
    {
        let handle = runtime.session();
        let session = handle.lock().await;
        assert_eq!(session.part_index(), 0);
        assert!(!session.is_ended());
        assert!(!session.timer().is_paused());
        assert_eq!(session.notices().drain()[0].kind, NoticeKind::PartFetchFailed);
        assert!(!session.notices().redirect_pending());
    }

    api.heal_part(PartId::new(7));
    assert!(runtime.go_to_part(1).await.unwrap());
    assert_eq!(runtime.session().lock().await.part_index(), 1);
}

#[tokio::test(start_paused = true)]
async fn redirect_policy_ends_the_attempt() {
    let api = backend();
    api.fail_part(PartId::new(7));
    let (runtime, mut events) = start(&api, PartFetchPolicy::Redirect).await;

    assert!(runtime.go_to_part(1).await.is_err());
    assert!(runtime.session().lock().await.is_ended());
    assert!(!runtime.session().lock().await.is_guarded());

    time::sleep(Duration::from_millis(2_100)).await;
    let mut redirects = 0;
    while let Ok(event) = events.try_recv() {
        if event == SessionEvent::Redirect(Redirect::Catalog) {
            redirects += 1;
        }
    }
    assert_eq!(redirects, 1);
    assert!(api.submissions().is_empty());
}
